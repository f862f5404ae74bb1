use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::definition::{CovenantDefinition, CovenantOperator, CovenantType};
use super::figures::{FigureField, FinancialFigures};
use crate::{types::*, CovenantError, CovenantResult};

/// Headroom (as % of threshold) below which a passing covenant is flagged.
pub const WARNING_BAND_PCT: Percent = dec!(15);

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    Warning,
    Breach,
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compliant => write!(f, "compliant"),
            Self::Warning => write!(f, "warning"),
            Self::Breach => write!(f, "breach"),
        }
    }
}

/// Outcome of testing one covenant against one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovenantTestResult {
    pub calculated_value: Decimal,
    pub status: ComplianceStatus,
    pub headroom_absolute: Decimal,
    pub headroom_percentage: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantEvaluationInput {
    pub covenant: CovenantDefinition,
    pub figures: FinancialFigures,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Test a covenant against one period's figures.
///
/// Pure and deterministic: identical inputs always give an identical result.
pub fn evaluate(
    covenant: &CovenantDefinition,
    figures: &FinancialFigures,
) -> CovenantResult<CovenantTestResult> {
    validate_threshold(covenant.threshold)?;
    let value = calculate_value(covenant, figures)?;
    assess(covenant.operator, covenant.threshold, value)
}

/// Headroom and status for a value that has already been calculated.
pub fn assess(
    operator: CovenantOperator,
    threshold: Decimal,
    calculated_value: Decimal,
) -> CovenantResult<CovenantTestResult> {
    validate_threshold(threshold)?;
    let (headroom_absolute, headroom_percentage) =
        compute_headroom(operator, threshold, calculated_value)?;

    Ok(CovenantTestResult {
        calculated_value,
        status: classify_status(headroom_percentage),
        headroom_absolute,
        headroom_percentage,
    })
}

/// Realized value of the covenant metric for the given figures.
pub fn calculate_value(
    covenant: &CovenantDefinition,
    figures: &FinancialFigures,
) -> CovenantResult<Decimal> {
    let name = covenant.covenant_type.as_str();

    match covenant.covenant_type {
        CovenantType::Leverage => {
            let total_debt = figures.require(FigureField::TotalDebt, name)?;
            let ebitda = nonzero_ebitda(figures, name)?;
            checked_ratio(total_debt, ebitda, "leverage: total_debt / ebitda")
        }
        CovenantType::InterestCoverage => {
            let ebitda = nonzero_ebitda(figures, name)?;
            let interest = figures.require(FigureField::InterestExpense, name)?;
            checked_ratio(ebitda, interest, "interest_coverage: ebitda / interest_expense")
        }
        CovenantType::FixedChargeCoverage => {
            let ebitda = nonzero_ebitda(figures, name)?;
            match figures.fixed_charges {
                Some(charges) if !charges.is_zero() => checked_ratio(
                    ebitda,
                    charges,
                    "fixed_charge_coverage: ebitda / fixed_charges",
                ),
                _ => {
                    let interest = figures.require(FigureField::InterestExpense, name)?;
                    checked_ratio(
                        ebitda,
                        interest,
                        "fixed_charge_coverage: ebitda / interest_expense",
                    )
                }
            }
        }
        CovenantType::CurrentRatio => {
            let assets = figures.require(FigureField::CurrentAssets, name)?;
            let liabilities = figures.require(FigureField::CurrentLiabilities, name)?;
            checked_ratio(
                assets,
                liabilities,
                "current_ratio: current_assets / current_liabilities",
            )
        }
        CovenantType::MinNetWorth => figures.require(FigureField::NetWorth, name),
        CovenantType::DebtServiceCoverage => Err(CovenantError::UnsupportedCovenant(
            "debt_service_coverage has no agreed formula; test it as a custom covenant".into(),
        )),
        CovenantType::Custom => {
            let formula = covenant.formula.as_ref().ok_or_else(|| CovenantError::InvalidInput {
                field: "formula".into(),
                reason: "Custom covenants must supply a formula.".into(),
            })?;
            let numerator = figures.require(formula.numerator, name)?;
            match formula.denominator {
                Some(field) => {
                    let denominator = figures.require(field, name)?;
                    checked_ratio(
                        numerator,
                        denominator,
                        &format!("custom: {} / {}", formula.numerator, field),
                    )
                }
                None => Ok(numerator),
            }
        }
    }
}

/// Signed distance from threshold, absolute and as % of threshold.
/// Positive means room to spare under either operator.
pub fn compute_headroom(
    operator: CovenantOperator,
    threshold: Decimal,
    calculated_value: Decimal,
) -> CovenantResult<(Decimal, Percent)> {
    validate_threshold(threshold)?;

    let headroom = match operator {
        CovenantOperator::Max => threshold.checked_sub(calculated_value),
        CovenantOperator::Min => calculated_value.checked_sub(threshold),
    }
    .ok_or_else(|| overflow("headroom"))?;

    let pct = checked_ratio(headroom, threshold, "headroom / threshold")?
        .checked_mul(dec!(100))
        .ok_or_else(|| overflow("headroom_percentage"))?;

    Ok((headroom, pct))
}

/// `< 0` breach, `[0, 15)` warning, `>= 15` compliant.
pub fn classify_status(headroom_percentage: Percent) -> ComplianceStatus {
    if headroom_percentage < Decimal::ZERO {
        ComplianceStatus::Breach
    } else if headroom_percentage < WARNING_BAND_PCT {
        ComplianceStatus::Warning
    } else {
        ComplianceStatus::Compliant
    }
}

/// Evaluate a covenant and wrap the result in the standard output envelope,
/// with warnings for figures that make the result hard to rely on.
pub fn evaluate_covenant(
    input: &CovenantEvaluationInput,
) -> CovenantResult<ComputationOutput<CovenantTestResult>> {
    let start = Instant::now();
    let covenant = &input.covenant;
    let figures = &input.figures;

    let result = evaluate(covenant, figures)?;
    let warnings = collect_warnings(covenant, figures);

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "covenant_type": covenant.covenant_type,
        "operator": covenant.operator,
        "threshold": covenant.threshold.to_string(),
        "warning_band_pct": WARNING_BAND_PCT.to_string(),
    });

    Ok(with_metadata(
        "Covenant Compliance Test",
        &assumptions,
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_threshold(threshold: Decimal) -> CovenantResult<()> {
    if threshold <= Decimal::ZERO {
        return Err(CovenantError::InvalidThreshold { threshold });
    }
    Ok(())
}

/// EBITDA for an EBITDA-based ratio. Zero EBITDA is rejected whether it
/// sits in the numerator or the denominator.
fn nonzero_ebitda(figures: &FinancialFigures, covenant: &str) -> CovenantResult<Decimal> {
    let ebitda = figures.require(FigureField::Ebitda, covenant)?;
    if ebitda.is_zero() {
        return Err(CovenantError::DivisionByZero {
            context: format!("{covenant}: ebitda is zero"),
        });
    }
    Ok(ebitda)
}

fn checked_ratio(numerator: Decimal, denominator: Decimal, context: &str) -> CovenantResult<Decimal> {
    if denominator.is_zero() {
        return Err(CovenantError::DivisionByZero {
            context: context.to_string(),
        });
    }
    numerator
        .checked_div(denominator)
        .ok_or_else(|| overflow(context))
}

fn overflow(context: &str) -> CovenantError {
    CovenantError::InvalidInput {
        field: context.to_string(),
        reason: "Result exceeds decimal range.".into(),
    }
}

fn collect_warnings(covenant: &CovenantDefinition, figures: &FinancialFigures) -> Vec<String> {
    let mut warnings = Vec::new();

    if covenant.covenant_type.is_ebitda_based() {
        if let Some(ebitda) = figures.ebitda {
            if ebitda < Decimal::ZERO {
                warnings.push("EBITDA is negative; ratio-based headroom may be meaningless.".into());
            }
        }
    }

    if covenant.covenant_type == CovenantType::FixedChargeCoverage
        && figures.fixed_charges.map_or(true, |c| c.is_zero())
    {
        warnings.push("Fixed charges not reported; interest expense used as denominator.".into());
    }

    if covenant.covenant_type == CovenantType::MinNetWorth {
        if let Some(nw) = figures.net_worth {
            if nw < Decimal::ZERO {
                warnings.push("Net worth is negative.".into());
            }
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
