pub mod frequency;
pub mod thresholds;

pub use frequency::{cure_deadline, next_test_date, TestingFrequency};
pub use thresholds::{ThresholdSchedule, ThresholdStep};
