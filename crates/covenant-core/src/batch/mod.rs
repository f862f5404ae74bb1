pub mod runner;
pub mod sink;

pub use runner::{
    run_covenant_tests, BatchCovenant, BatchPeriod, CovenantBatchInput, CovenantBatchOutput,
    CovenantTestFailure, FailurePolicy,
};
pub use sink::{draft_alert, AlertDraft, AlertSeverity, CovenantTestRecord, InMemorySink, TestRecordSink};
