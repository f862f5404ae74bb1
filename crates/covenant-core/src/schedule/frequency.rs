use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{CovenantError, CovenantResult};

/// How often a covenant is tested.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestingFrequency {
    Monthly,
    #[default]
    Quarterly,
    SemiAnnual,
    Annual,
}

impl TestingFrequency {
    pub fn months(&self) -> u32 {
        match self {
            Self::Monthly => 1,
            Self::Quarterly => 3,
            Self::SemiAnnual => 6,
            Self::Annual => 12,
        }
    }
}

/// The period end following `period_end` for a covenant tested at
/// `frequency`. Month-end dates roll to the next month-end, so a quarterly
/// test on 30 Sep lands on 31 Dec rather than 30 Dec.
pub fn next_test_date(period_end: NaiveDate, frequency: TestingFrequency) -> CovenantResult<NaiveDate> {
    let shifted = period_end
        .checked_add_months(Months::new(frequency.months()))
        .ok_or_else(|| date_overflow(period_end))?;

    if is_month_end(period_end) {
        month_end(shifted)
    } else {
        Ok(shifted)
    }
}

/// Last day on which a breach found in `period_end` may still be cured.
pub fn cure_deadline(period_end: NaiveDate, grace_period_days: u32) -> CovenantResult<NaiveDate> {
    period_end
        .checked_add_days(Days::new(u64::from(grace_period_days)))
        .ok_or_else(|| date_overflow(period_end))
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

fn month_end(date: NaiveDate) -> CovenantResult<NaiveDate> {
    let first = date.with_day(1).ok_or_else(|| date_overflow(date))?;
    first
        .checked_add_months(Months::new(1))
        .and_then(|next_first| next_first.pred_opt())
        .ok_or_else(|| date_overflow(date))
}

fn date_overflow(date: NaiveDate) -> CovenantError {
    CovenantError::DateError(format!("Date arithmetic out of range from {date}"))
}
