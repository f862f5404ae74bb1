use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::sink::{CovenantTestRecord, TestRecordSink};
use crate::covenant::{
    evaluate, ComplianceStatus, CovenantDefinition, CovenantOperator, CovenantType,
    CustomFormula, FinancialFigures,
};
use crate::schedule::{cure_deadline, next_test_date, TestingFrequency, ThresholdSchedule};
use crate::{types::*, CovenantError, CovenantResult};

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// A covenant as held by the covenant store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchCovenant {
    pub id: String,
    pub loan_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub covenant_type: CovenantType,
    pub operator: CovenantOperator,
    /// Flat threshold. Ignored when `threshold_schedule` is present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_schedule: Option<ThresholdSchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<CustomFormula>,
    #[serde(default)]
    pub grace_period_days: u32,
    #[serde(default)]
    pub testing_frequency: TestingFrequency,
}

/// One reporting period as held by the financial period store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPeriod {
    pub id: String,
    pub loan_id: String,
    pub period_end_date: NaiveDate,
    pub figures: FinancialFigures,
}

/// What to do when a single (covenant, period) pair cannot be evaluated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log the failure, report it, and carry on with the remaining pairs.
    #[default]
    Skip,
    /// Stop at the first failure and return its error.
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantBatchInput {
    pub covenants: Vec<BatchCovenant>,
    pub periods: Vec<BatchPeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovenantTestFailure {
    pub covenant_id: String,
    pub period_id: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantBatchOutput {
    pub records: Vec<CovenantTestRecord>,
    pub failures: Vec<CovenantTestFailure>,
    pub tests_run: usize,
    pub compliant_count: usize,
    pub warning_count: usize,
    pub breach_count: usize,
    pub all_compliant: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Test every covenant against every period of the same loan, handing each
/// successful result to `sink`.
///
/// Periods are tested in date order. Sink errors always stop the run; pair
/// errors follow `input.failure_policy`.
pub fn run_covenant_tests(
    input: &CovenantBatchInput,
    sink: &mut dyn TestRecordSink,
) -> CovenantResult<ComputationOutput<CovenantBatchOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.covenants.is_empty() {
        return Err(CovenantError::InsufficientData(
            "At least one covenant must be provided.".into(),
        ));
    }
    let tested_at = input.tested_at.ok_or_else(|| CovenantError::InvalidInput {
        field: "tested_at".into(),
        reason: "A test timestamp is required.".into(),
    })?;

    let mut periods: Vec<&BatchPeriod> = input.periods.iter().collect();
    periods.sort_by_key(|p| p.period_end_date);

    info!(
        covenants = input.covenants.len(),
        periods = periods.len(),
        policy = ?input.failure_policy,
        "running covenant tests"
    );

    let mut records: Vec<CovenantTestRecord> = Vec::new();
    let mut failures: Vec<CovenantTestFailure> = Vec::new();

    for cov in &input.covenants {
        if cov.threshold.is_some() && cov.threshold_schedule.is_some() {
            warnings.push(format!(
                "Covenant '{}': both threshold and threshold_schedule given; schedule used.",
                cov.id
            ));
        }

        let loan_periods: Vec<&BatchPeriod> = periods
            .iter()
            .copied()
            .filter(|p| p.loan_id == cov.loan_id)
            .collect();

        if loan_periods.is_empty() {
            warnings.push(format!(
                "Covenant '{}': no periods reported for loan '{}'.",
                cov.id, cov.loan_id
            ));
            continue;
        }

        for period in loan_periods {
            match test_pair(cov, period, tested_at) {
                Ok(record) => {
                    debug!(
                        covenant = %cov.id,
                        period = %period.id,
                        status = %record.result.status,
                        value = %record.result.calculated_value,
                        "covenant tested"
                    );
                    sink.record(&record)?;
                    records.push(record);
                }
                Err(e) => match input.failure_policy {
                    FailurePolicy::Abort => {
                        warn!(covenant = %cov.id, period = %period.id, error = %e, "aborting run");
                        return Err(e);
                    }
                    FailurePolicy::Skip => {
                        warn!(covenant = %cov.id, period = %period.id, error = %e, "skipping covenant test");
                        failures.push(CovenantTestFailure {
                            covenant_id: cov.id.clone(),
                            period_id: period.id.clone(),
                            kind: e.kind().to_string(),
                            message: e.to_string(),
                        });
                    }
                },
            }
        }
    }

    let count = |status: ComplianceStatus| records.iter().filter(|r| r.result.status == status).count();
    let compliant_count = count(ComplianceStatus::Compliant);
    let warning_count = count(ComplianceStatus::Warning);
    let breach_count = count(ComplianceStatus::Breach);
    let all_compliant = failures.is_empty() && compliant_count == records.len();

    info!(
        tested = records.len(),
        failed = failures.len(),
        breaches = breach_count,
        "covenant tests complete"
    );

    let output = CovenantBatchOutput {
        tests_run: records.len() + failures.len(),
        records,
        failures,
        compliant_count,
        warning_count,
        breach_count,
        all_compliant,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "covenant_count": input.covenants.len(),
        "period_count": input.periods.len(),
        "failure_policy": input.failure_policy,
        "tested_at": tested_at,
    });

    Ok(with_metadata(
        "Covenant Compliance Batch Test",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn test_pair(
    cov: &BatchCovenant,
    period: &BatchPeriod,
    tested_at: DateTime<Utc>,
) -> CovenantResult<CovenantTestRecord> {
    let threshold = resolve_threshold(cov, period.period_end_date)?;
    let definition = CovenantDefinition {
        covenant_type: cov.covenant_type,
        operator: cov.operator,
        threshold,
        formula: cov.formula.clone(),
    };

    let result = evaluate(&definition, &period.figures)?;

    let cure = match result.status {
        ComplianceStatus::Breach => Some(cure_deadline(period.period_end_date, cov.grace_period_days)?),
        _ => None,
    };

    Ok(CovenantTestRecord {
        covenant_id: cov.id.clone(),
        covenant_name: cov.name.clone(),
        covenant_type: cov.covenant_type,
        loan_id: cov.loan_id.clone(),
        period_id: period.id.clone(),
        period_end_date: period.period_end_date,
        threshold,
        tested_at,
        result,
        cure_deadline: cure,
        next_test_date: next_test_date(period.period_end_date, cov.testing_frequency)?,
    })
}

fn resolve_threshold(cov: &BatchCovenant, period_end: NaiveDate) -> CovenantResult<Decimal> {
    match (&cov.threshold_schedule, cov.threshold) {
        (Some(schedule), _) => schedule.effective_threshold(period_end),
        (None, Some(threshold)) => Ok(threshold),
        (None, None) => Err(CovenantError::InvalidInput {
            field: "threshold".into(),
            reason: format!("Covenant '{}' has neither threshold nor schedule.", cov.id),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::sink::InMemorySink;
    use crate::schedule::ThresholdStep;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn tested_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-02-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn leverage(threshold: Decimal) -> BatchCovenant {
        BatchCovenant {
            id: "cov-lev".into(),
            loan_id: "loan-a".into(),
            name: "Max Total Leverage".into(),
            covenant_type: CovenantType::Leverage,
            operator: CovenantOperator::Max,
            threshold: Some(threshold),
            threshold_schedule: None,
            formula: None,
            grace_period_days: 30,
            testing_frequency: TestingFrequency::Quarterly,
        }
    }

    fn period(id: &str, end: NaiveDate, debt: Decimal, ebitda: Option<Decimal>) -> BatchPeriod {
        BatchPeriod {
            id: id.into(),
            loan_id: "loan-a".into(),
            period_end_date: end,
            figures: FinancialFigures {
                total_debt: Some(debt),
                ebitda,
                ..Default::default()
            },
        }
    }

    fn batch(covenants: Vec<BatchCovenant>, periods: Vec<BatchPeriod>) -> CovenantBatchInput {
        CovenantBatchInput {
            covenants,
            periods,
            tested_at: Some(tested_at()),
            failure_policy: FailurePolicy::Skip,
        }
    }

    #[test]
    fn test_periods_tested_in_date_order() {
        let input = batch(
            vec![leverage(dec!(4.0))],
            vec![
                period("q4", d(2024, 12, 31), dec!(38), Some(dec!(10))),
                period("q3", d(2024, 9, 30), dec!(20), Some(dec!(10))),
            ],
        );
        let mut sink = InMemorySink::new();
        let out = run_covenant_tests(&input, &mut sink).unwrap();
        let ids: Vec<&str> = sink.records.iter().map(|r| r.period_id.as_str()).collect();
        assert_eq!(ids, vec!["q3", "q4"]);
        assert_eq!(out.result.compliant_count, 1);
        assert_eq!(out.result.warning_count, 1);
        assert!(!out.result.all_compliant);
    }

    #[test]
    fn test_breach_sets_cure_deadline() {
        let input = batch(
            vec![leverage(dec!(4.0))],
            vec![period("q4", d(2024, 12, 31), dec!(50), Some(dec!(10)))],
        );
        let mut sink = InMemorySink::new();
        let out = run_covenant_tests(&input, &mut sink).unwrap();
        let rec = &out.result.records[0];
        assert_eq!(rec.result.status, ComplianceStatus::Breach);
        assert_eq!(rec.cure_deadline, Some(d(2025, 1, 30)));
        assert_eq!(rec.next_test_date, d(2025, 3, 31));
        assert_eq!(sink.alerts.len(), 1);
    }

    #[test]
    fn test_skip_policy_reports_failure_and_continues() {
        let input = batch(
            vec![leverage(dec!(4.0))],
            vec![
                period("q3", d(2024, 9, 30), dec!(20), None),
                period("q4", d(2024, 12, 31), dec!(20), Some(dec!(10))),
            ],
        );
        let mut sink = InMemorySink::new();
        let out = run_covenant_tests(&input, &mut sink).unwrap();
        assert_eq!(out.result.tests_run, 2);
        assert_eq!(out.result.records.len(), 1);
        let failure = &out.result.failures[0];
        assert_eq!(failure.covenant_id, "cov-lev");
        assert_eq!(failure.period_id, "q3");
        assert_eq!(failure.kind, "missing_input");
        assert!(failure.message.contains("ebitda"));
        assert!(!out.result.all_compliant);
    }

    #[test]
    fn test_abort_policy_stops_on_first_failure() {
        let mut input = batch(
            vec![leverage(Decimal::ZERO)],
            vec![period("q4", d(2024, 12, 31), dec!(20), Some(dec!(10)))],
        );
        input.failure_policy = FailurePolicy::Abort;
        let mut sink = InMemorySink::new();
        let err = run_covenant_tests(&input, &mut sink).unwrap_err();
        assert!(matches!(err, CovenantError::InvalidThreshold { .. }));
        assert!(sink.records.is_empty());
    }

    #[test]
    fn test_schedule_threshold_resolved_per_period() {
        let mut cov = leverage(dec!(9.9));
        cov.threshold_schedule = Some(ThresholdSchedule::new(vec![
            ThresholdStep { effective_from: d(2024, 1, 1), threshold: dec!(5.0) },
            ThresholdStep { effective_from: d(2024, 10, 1), threshold: dec!(4.0) },
        ]));
        let input = batch(
            vec![cov],
            vec![
                period("q3", d(2024, 9, 30), dec!(45), Some(dec!(10))),
                period("q4", d(2024, 12, 31), dec!(45), Some(dec!(10))),
            ],
        );
        let mut sink = InMemorySink::new();
        let out = run_covenant_tests(&input, &mut sink).unwrap();
        assert_eq!(out.result.records[0].threshold, dec!(5.0));
        assert_eq!(out.result.records[0].result.status, ComplianceStatus::Warning);
        assert_eq!(out.result.records[1].threshold, dec!(4.0));
        assert_eq!(out.result.records[1].result.status, ComplianceStatus::Breach);
        assert!(out.warnings.iter().any(|w| w.contains("schedule used")));
    }

    #[test]
    fn test_other_loans_periods_ignored() {
        let mut other = period("x", d(2024, 12, 31), dec!(99), Some(dec!(1)));
        other.loan_id = "loan-b".into();
        let input = batch(
            vec![leverage(dec!(4.0))],
            vec![other, period("q4", d(2024, 12, 31), dec!(10), Some(dec!(10)))],
        );
        let mut sink = InMemorySink::new();
        let out = run_covenant_tests(&input, &mut sink).unwrap();
        assert_eq!(out.result.records.len(), 1);
        assert!(out.result.all_compliant);
    }

    #[test]
    fn test_missing_timestamp_rejected() {
        let mut input = batch(vec![leverage(dec!(4.0))], vec![]);
        input.tested_at = None;
        let err = run_covenant_tests(&input, &mut InMemorySink::new()).unwrap_err();
        assert!(matches!(err, CovenantError::InvalidInput { .. }));
    }

    #[test]
    fn test_empty_covenants_rejected() {
        let input = batch(vec![], vec![]);
        match run_covenant_tests(&input, &mut InMemorySink::new()).unwrap_err() {
            CovenantError::InsufficientData(_) => {}
            other => panic!("Expected InsufficientData, got {other:?}"),
        }
    }
}
