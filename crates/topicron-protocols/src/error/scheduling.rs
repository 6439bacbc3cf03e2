//! Scheduling errors.
//!
//! Engine and business failures are normally folded into a
//! [`ScheduleResult`](crate::ScheduleResult); only `Precondition`,
//! `Persistence` and `NoStrategy` are expected to surface as `Err`.

use thiserror::Error;

use super::{EngineError, StoreError};

#[derive(Debug, Clone, Error)]
pub enum SchedulingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Precondition violated: {0}")]
    Precondition(String),

    #[error("Invalid cron expression '{expression}': {reason}")]
    Cron { expression: String, reason: String },

    #[error("{0} not implemented")]
    NotImplemented(String),

    #[error("No strategy for schedule type {schedule_type}, available: [{}]", .available.join(", "))]
    NoStrategy {
        schedule_type: String,
        available: Vec<String>,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl SchedulingError {
    /// Whether this error should surface as `Err` rather than a failed result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Precondition(_) | Self::Persistence(_) | Self::NoStrategy { .. }
        )
    }
}
