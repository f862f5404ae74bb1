pub mod definition;
pub mod evaluator;
pub mod figures;

pub use definition::{CovenantDefinition, CovenantOperator, CovenantType, CustomFormula};
pub use evaluator::{
    assess, calculate_value, classify_status, compute_headroom, evaluate, evaluate_covenant,
    ComplianceStatus, CovenantEvaluationInput, CovenantTestResult, WARNING_BAND_PCT,
};
pub use figures::{FigureField, FinancialFigures};
