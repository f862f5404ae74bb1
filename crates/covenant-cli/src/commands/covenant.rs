use chrono::Utc;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use covenant_core::batch::{self, CovenantBatchInput, FailurePolicy, InMemorySink};
use covenant_core::covenant::{
    self, CovenantDefinition, CovenantEvaluationInput, CovenantOperator, CovenantType,
    CustomFormula, FigureField, FinancialFigures,
};

use crate::config::RunConfig;
use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CovenantTypeArg {
    Leverage,
    InterestCoverage,
    FixedChargeCoverage,
    CurrentRatio,
    MinNetWorth,
    DebtServiceCoverage,
    Custom,
}

impl From<CovenantTypeArg> for CovenantType {
    fn from(arg: CovenantTypeArg) -> Self {
        match arg {
            CovenantTypeArg::Leverage => Self::Leverage,
            CovenantTypeArg::InterestCoverage => Self::InterestCoverage,
            CovenantTypeArg::FixedChargeCoverage => Self::FixedChargeCoverage,
            CovenantTypeArg::CurrentRatio => Self::CurrentRatio,
            CovenantTypeArg::MinNetWorth => Self::MinNetWorth,
            CovenantTypeArg::DebtServiceCoverage => Self::DebtServiceCoverage,
            CovenantTypeArg::Custom => Self::Custom,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OperatorArg {
    Max,
    Min,
}

impl From<OperatorArg> for CovenantOperator {
    fn from(arg: OperatorArg) -> Self {
        match arg {
            OperatorArg::Max => Self::Max,
            OperatorArg::Min => Self::Min,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FigureArg {
    Revenue,
    Ebitda,
    TotalDebt,
    InterestExpense,
    FixedCharges,
    CurrentAssets,
    CurrentLiabilities,
    NetWorth,
}

impl From<FigureArg> for FigureField {
    fn from(arg: FigureArg) -> Self {
        match arg {
            FigureArg::Revenue => Self::Revenue,
            FigureArg::Ebitda => Self::Ebitda,
            FigureArg::TotalDebt => Self::TotalDebt,
            FigureArg::InterestExpense => Self::InterestExpense,
            FigureArg::FixedCharges => Self::FixedCharges,
            FigureArg::CurrentAssets => Self::CurrentAssets,
            FigureArg::CurrentLiabilities => Self::CurrentLiabilities,
            FigureArg::NetWorth => Self::NetWorth,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    Skip,
    Abort,
}

impl From<PolicyArg> for FailurePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Skip => Self::Skip,
            PolicyArg::Abort => Self::Abort,
        }
    }
}

/// Arguments for a single covenant test
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct EvaluateArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Covenant type
    #[arg(long = "type", value_enum)]
    pub covenant_type: Option<CovenantTypeArg>,

    /// Whether the threshold is a ceiling (max) or a floor (min)
    #[arg(long, value_enum)]
    pub operator: Option<OperatorArg>,

    /// Threshold in force for the period
    #[arg(long)]
    pub threshold: Option<Decimal>,

    /// Numerator figure for a custom covenant
    #[arg(long, value_enum)]
    pub numerator: Option<FigureArg>,

    /// Denominator figure for a custom covenant (omit for an absolute test)
    #[arg(long, value_enum)]
    pub denominator: Option<FigureArg>,

    /// Revenue
    #[arg(long)]
    pub revenue: Option<Decimal>,

    /// EBITDA
    #[arg(long)]
    pub ebitda: Option<Decimal>,

    /// Total debt
    #[arg(long)]
    pub total_debt: Option<Decimal>,

    /// Interest expense
    #[arg(long)]
    pub interest_expense: Option<Decimal>,

    /// Fixed charges
    #[arg(long)]
    pub fixed_charges: Option<Decimal>,

    /// Current assets
    #[arg(long)]
    pub current_assets: Option<Decimal>,

    /// Current liabilities
    #[arg(long)]
    pub current_liabilities: Option<Decimal>,

    /// Tangible net worth
    #[arg(long)]
    pub net_worth: Option<Decimal>,
}

/// Arguments for a portfolio test run
#[derive(Args)]
pub struct RunTestsArgs {
    /// Path to JSON/YAML batch file (covenants, periods)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to YAML run configuration
    #[arg(long)]
    pub config: Option<String>,

    /// Failure handling for individual covenant tests (overrides input and config)
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let eval_input: CovenantEvaluationInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        input_from_flags(&args)?
    };

    let result = covenant::evaluate_covenant(&eval_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_tests(args: RunTestsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut batch_input: CovenantBatchInput = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input file is required for run-tests".into());
    };

    let config = RunConfig::load(args.config.as_deref())?;
    apply_run_settings(&mut batch_input, &config, args.policy);

    let mut sink = InMemorySink::new();
    let result = batch::run_covenant_tests(&batch_input, &mut sink)?;

    let mut value = serde_json::to_value(result)?;
    if let Value::Object(ref mut map) = value {
        map.insert("alerts".into(), serde_json::to_value(&sink.alerts)?);
    }
    Ok(value)
}

/// Precedence: `--policy` flag, then config file, then the input file.
/// A missing timestamp falls back to config, then the current time.
fn apply_run_settings(input: &mut CovenantBatchInput, config: &RunConfig, policy: Option<PolicyArg>) {
    if let Some(p) = policy.map(FailurePolicy::from).or(config.failure_policy) {
        input.failure_policy = p;
    }
    if input.tested_at.is_none() {
        input.tested_at = Some(config.tested_at.unwrap_or_else(Utc::now));
    }
}

fn input_from_flags(args: &EvaluateArgs) -> Result<CovenantEvaluationInput, Box<dyn std::error::Error>> {
    let covenant_type: CovenantType = args
        .covenant_type
        .ok_or("--type is required (or provide --input)")?
        .into();
    let operator = args
        .operator
        .ok_or("--operator is required (or provide --input)")?
        .into();
    let threshold = args
        .threshold
        .ok_or("--threshold is required (or provide --input)")?;

    let formula = match (covenant_type, args.numerator) {
        (CovenantType::Custom, Some(numerator)) => Some(CustomFormula {
            numerator: numerator.into(),
            denominator: args.denominator.map(FigureField::from),
        }),
        (CovenantType::Custom, None) => {
            return Err("--numerator is required for custom covenants".into());
        }
        _ => None,
    };

    Ok(CovenantEvaluationInput {
        covenant: CovenantDefinition {
            covenant_type,
            operator,
            threshold,
            formula,
        },
        figures: FinancialFigures {
            revenue: args.revenue,
            ebitda: args.ebitda,
            total_debt: args.total_debt,
            interest_expense: args.interest_expense,
            fixed_charges: args.fixed_charges,
            current_assets: args.current_assets,
            current_liabilities: args.current_liabilities,
            net_worth: args.net_worth,
        },
    })
}
