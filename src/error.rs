//! Error taxonomy shared by every chart operation

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while validating, computing or searching charts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("Ephemeris data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Location unresolved: {0}")]
    LocationUnresolved(String),

    #[error("Search window of {requested_days:.1} days exceeds the maximum of {max_days:.1} days")]
    RangeTooLarge { requested_days: f64, max_days: f64 },

    #[error("Batch of {size} requests exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("Timed out: {0}")]
    TimedOut(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChartError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ChartError::InputValidation(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChartError::InputValidation(_) => ErrorKind::InputValidation,
            ChartError::DataUnavailable(_) => ErrorKind::DataUnavailable,
            ChartError::LocationUnresolved(_) => ErrorKind::LocationUnresolved,
            ChartError::RangeTooLarge { .. } => ErrorKind::RangeTooLarge,
            ChartError::BatchTooLarge { .. } => ErrorKind::BatchTooLarge,
            ChartError::TimedOut(_) => ErrorKind::TimedOut,
            ChartError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn descriptor(&self) -> ErrorDescriptor {
        ErrorDescriptor {
            kind: self.kind(),
            reason: self.to_string(),
        }
    }
}

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputValidation,
    DataUnavailable,
    LocationUnresolved,
    RangeTooLarge,
    BatchTooLarge,
    TimedOut,
    Internal,
}

/// Structured error returned to callers in place of a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub reason: String,
}

impl From<ChartError> for ErrorDescriptor {
    fn from(error: ChartError) -> Self {
        error.descriptor()
    }
}
