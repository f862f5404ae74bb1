use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CovenantError {
    #[error("Missing input: {covenant} requires '{field}'")]
    MissingInput { covenant: String, field: String },

    #[error("Invalid threshold: {threshold} cannot be used as a covenant limit")]
    InvalidThreshold { threshold: Decimal },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Unsupported covenant: {0}")]
    UnsupportedCovenant(String),

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Date error: {0}")]
    DateError(String),
}

impl CovenantError {
    /// Short machine-readable kind, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput { .. } => "missing_input",
            Self::InvalidThreshold { .. } => "invalid_threshold",
            Self::DivisionByZero { .. } => "division_by_zero",
            Self::UnsupportedCovenant(_) => "unsupported_covenant",
            Self::InvalidInput { .. } => "invalid_input",
            Self::InsufficientData(_) => "insufficient_data",
            Self::DateError(_) => "date_error",
        }
    }
}
