pub mod error;
pub mod types;

#[cfg(feature = "evaluator")]
pub mod covenant;

#[cfg(feature = "schedule")]
pub mod schedule;

#[cfg(feature = "batch")]
pub mod batch;

pub use error::CovenantError;
pub use types::*;

/// Standard result type for all covenant operations
pub type CovenantResult<T> = Result<T, CovenantError>;
