use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CovenantError, CovenantResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThresholdStep {
    pub effective_from: NaiveDate,
    pub threshold: Decimal,
}

/// Contractual thresholds over the life of a loan, e.g. a leverage limit
/// stepping down from 5.0x to 4.0x.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ThresholdSchedule {
    pub steps: Vec<ThresholdStep>,
}

impl ThresholdSchedule {
    pub fn new(steps: Vec<ThresholdStep>) -> Self {
        Self { steps }
    }

    /// Threshold in force on `date`: the latest step whose `effective_from`
    /// is on or before it. Step order in the schedule does not matter.
    pub fn effective_threshold(&self, date: NaiveDate) -> CovenantResult<Decimal> {
        if self.steps.is_empty() {
            return Err(CovenantError::InsufficientData(
                "Threshold schedule has no steps.".into(),
            ));
        }

        self.steps
            .iter()
            .filter(|s| s.effective_from <= date)
            .max_by_key(|s| s.effective_from)
            .map(|s| s.threshold)
            .ok_or_else(|| {
                CovenantError::DateError(format!("No threshold in force on {date}"))
            })
    }
}
