use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;

use covenant_core::batch::{CovenantBatchInput, CovenantBatchOutput, InMemorySink};
use covenant_core::covenant::CovenantEvaluationInput;
use covenant_core::ComputationOutput;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Single covenant test
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluate_covenant(input_json: String) -> NapiResult<String> {
    let input: CovenantEvaluationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = covenant_core::covenant::evaluate_covenant(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Batch run
// ---------------------------------------------------------------------------

/// Batch envelope plus the alert drafts the dashboard persists alongside the
/// test records.
#[derive(Serialize)]
struct BatchResponse {
    #[serde(flatten)]
    output: ComputationOutput<CovenantBatchOutput>,
    alerts: Vec<covenant_core::batch::AlertDraft>,
}

#[napi]
pub fn run_covenant_tests(input_json: String) -> NapiResult<String> {
    let input: CovenantBatchInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let mut sink = InMemorySink::new();
    let output =
        covenant_core::batch::run_covenant_tests(&input, &mut sink).map_err(to_napi_error)?;
    let response = BatchResponse {
        output,
        alerts: sink.alerts,
    };
    serde_json::to_string(&response).map_err(to_napi_error)
}
