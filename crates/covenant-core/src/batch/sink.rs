use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::covenant::{ComplianceStatus, CovenantTestResult, CovenantType};
use crate::CovenantResult;

/// A persisted covenant test: the evaluator result plus the context a store
/// needs to file it. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CovenantTestRecord {
    pub covenant_id: String,
    pub covenant_name: String,
    pub covenant_type: CovenantType,
    pub loan_id: String,
    pub period_id: String,
    pub period_end_date: NaiveDate,
    pub threshold: Decimal,
    pub tested_at: DateTime<Utc>,
    pub result: CovenantTestResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cure_deadline: Option<NaiveDate>,
    pub next_test_date: NaiveDate,
}

/// Receives test records after a successful evaluation.
pub trait TestRecordSink {
    fn record(&mut self, record: &CovenantTestRecord) -> CovenantResult<()>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertDraft {
    pub covenant_id: String,
    pub loan_id: String,
    pub period_id: String,
    pub status: ComplianceStatus,
    pub severity: AlertSeverity,
    pub message: String,
}

/// Alert for a warning or breach; compliant records produce none.
pub fn draft_alert(record: &CovenantTestRecord) -> Option<AlertDraft> {
    let severity = match record.result.status {
        ComplianceStatus::Compliant => return None,
        ComplianceStatus::Warning => AlertSeverity::Medium,
        ComplianceStatus::Breach => AlertSeverity::High,
    };

    let headroom = record.result.headroom_percentage.round_dp(2);
    let message = match record.result.status {
        ComplianceStatus::Breach => format!(
            "{} breached for period ending {}: {} against threshold {} ({}% headroom)",
            record.covenant_name,
            record.period_end_date,
            record.result.calculated_value.round_dp(4),
            record.threshold,
            headroom,
        ),
        _ => format!(
            "{} within {}% of threshold {} for period ending {}",
            record.covenant_name, headroom, record.threshold, record.period_end_date,
        ),
    };

    Some(AlertDraft {
        covenant_id: record.covenant_id.clone(),
        loan_id: record.loan_id.clone(),
        period_id: record.period_id.clone(),
        status: record.result.status,
        severity,
        message,
    })
}

/// Keeps records and alert drafts in memory. Used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub records: Vec<CovenantTestRecord>,
    pub alerts: Vec<AlertDraft>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TestRecordSink for InMemorySink {
    fn record(&mut self, record: &CovenantTestRecord) -> CovenantResult<()> {
        if let Some(alert) = draft_alert(record) {
            self.alerts.push(alert);
        }
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(status: ComplianceStatus, pct: Decimal) -> CovenantTestRecord {
        CovenantTestRecord {
            covenant_id: "cov-1".into(),
            covenant_name: "Max Total Leverage".into(),
            covenant_type: CovenantType::Leverage,
            loan_id: "loan-1".into(),
            period_id: "p-1".into(),
            period_end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            threshold: dec!(5.0),
            tested_at: DateTime::parse_from_rfc3339("2025-01-15T09:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            result: CovenantTestResult {
                calculated_value: dec!(4.8),
                status,
                headroom_absolute: dec!(0.2),
                headroom_percentage: pct,
            },
            cure_deadline: None,
            next_test_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        }
    }

    #[test]
    fn test_no_alert_for_compliant() {
        assert!(draft_alert(&record(ComplianceStatus::Compliant, dec!(40))).is_none());
    }

    #[test]
    fn test_severity_mapping() {
        let warn = draft_alert(&record(ComplianceStatus::Warning, dec!(4))).unwrap();
        assert_eq!(warn.severity, AlertSeverity::Medium);
        assert!(warn.message.contains("within 4%"));

        let breach = draft_alert(&record(ComplianceStatus::Breach, dec!(-10))).unwrap();
        assert_eq!(breach.severity, AlertSeverity::High);
        assert!(breach.message.contains("breached"));
    }

    #[test]
    fn test_in_memory_sink_collects_alerts() {
        let mut sink = InMemorySink::new();
        sink.record(&record(ComplianceStatus::Compliant, dec!(40))).unwrap();
        sink.record(&record(ComplianceStatus::Breach, dec!(-10))).unwrap();
        assert_eq!(sink.records.len(), 2);
        assert_eq!(sink.alerts.len(), 1);
        assert_eq!(sink.alerts[0].status, ComplianceStatus::Breach);
    }
}
