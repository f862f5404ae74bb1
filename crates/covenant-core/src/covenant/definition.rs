use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::figures::FigureField;

// ---------------------------------------------------------------------------
// Covenant definition types
// ---------------------------------------------------------------------------

/// The financial test a covenant imposes on the borrower.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CovenantType {
    /// Total Debt / EBITDA.
    Leverage,
    /// EBITDA / Interest Expense.
    InterestCoverage,
    /// EBITDA / Fixed Charges, falling back to Interest Expense.
    FixedChargeCoverage,
    /// Current Assets / Current Liabilities.
    CurrentRatio,
    /// Net worth as an absolute figure.
    MinNetWorth,
    /// Present in covenant packages but has no agreed formula; always
    /// rejected at evaluation time.
    DebtServiceCoverage,
    /// Evaluated through the definition's `CustomFormula`.
    Custom,
}

impl CovenantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leverage => "leverage",
            Self::InterestCoverage => "interest_coverage",
            Self::FixedChargeCoverage => "fixed_charge_coverage",
            Self::CurrentRatio => "current_ratio",
            Self::MinNetWorth => "min_net_worth",
            Self::DebtServiceCoverage => "debt_service_coverage",
            Self::Custom => "custom",
        }
    }

    /// True for covenants whose calculated value is a ratio with EBITDA in it.
    pub fn is_ebitda_based(&self) -> bool {
        matches!(
            self,
            Self::Leverage | Self::InterestCoverage | Self::FixedChargeCoverage
        )
    }
}

impl std::fmt::Display for CovenantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CovenantOperator {
    /// Calculated value must not exceed threshold.
    Max,
    /// Calculated value must not fall below threshold.
    Min,
}

impl std::fmt::Display for CovenantOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max => write!(f, "max"),
            Self::Min => write!(f, "min"),
        }
    }
}

/// A caller-supplied formula for `CovenantType::Custom`.
///
/// With a denominator the covenant is a ratio `numerator / denominator`;
/// without one the numerator figure is tested directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomFormula {
    pub numerator: FigureField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator: Option<FigureField>,
}

/// Everything the evaluator needs to know about one covenant.
///
/// `threshold` is the limit in force for the period under test; resolving
/// step-downs happens before the definition reaches the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CovenantDefinition {
    #[serde(rename = "type")]
    pub covenant_type: CovenantType,
    pub operator: CovenantOperator,
    pub threshold: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<CustomFormula>,
}

impl CovenantDefinition {
    pub fn new(covenant_type: CovenantType, operator: CovenantOperator, threshold: Decimal) -> Self {
        Self {
            covenant_type,
            operator,
            threshold,
            formula: None,
        }
    }

    pub fn custom(formula: CustomFormula, operator: CovenantOperator, threshold: Decimal) -> Self {
        Self {
            covenant_type: CovenantType::Custom,
            operator,
            threshold,
            formula: Some(formula),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_definition_wire_format() {
        let json = r#"{"type":"fixed_charge_coverage","operator":"min","threshold":"1.1"}"#;
        let def: CovenantDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.covenant_type, CovenantType::FixedChargeCoverage);
        assert_eq!(def.operator, CovenantOperator::Min);
        assert_eq!(def.threshold, dec!(1.1));
        assert!(def.formula.is_none());
    }

    #[test]
    fn test_custom_definition_carries_formula() {
        let json = r#"{
            "type": "custom",
            "operator": "max",
            "threshold": "0.5",
            "formula": { "numerator": "total_debt", "denominator": "net_worth" }
        }"#;
        let def: CovenantDefinition = serde_json::from_str(json).unwrap();
        let formula = def.formula.unwrap();
        assert_eq!(formula.numerator, FigureField::TotalDebt);
        assert_eq!(formula.denominator, Some(FigureField::NetWorth));
    }

    #[test]
    fn test_display_matches_wire_names() {
        assert_eq!(CovenantType::MinNetWorth.to_string(), "min_net_worth");
        assert_eq!(CovenantOperator::Max.to_string(), "max");
    }
}
