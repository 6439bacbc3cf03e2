//! Scheduling outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::JobKey;
use crate::error::SchedulingError;

/// Which inbound operation produced a result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleOperation {
    #[default]
    Create,
    Update,
    Delete,
    Enable,
    Disable,
}

impl fmt::Display for ScheduleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Enable => "enable",
            Self::Disable => "disable",
        };
        f.write_str(s)
    }
}

/// Outcome of a scheduling operation.
///
/// Expected failure modes (validation, engine errors, unimplemented
/// recurrences) are reported here instead of as `Err`.
#[derive(Debug, Clone, Default)]
pub struct ScheduleResult {
    pub operation: ScheduleOperation,
    pub success: bool,
    pub job_ids: Vec<JobKey>,
    pub message: Option<String>,
    pub error: Option<SchedulingError>,
    /// Set when a failed update left the schedule without any registered job.
    pub coverage_lost: bool,
}

impl ScheduleResult {
    pub fn success(job_ids: Vec<JobKey>) -> Self {
        Self {
            success: true,
            job_ids,
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn failure_with(message: impl Into<String>, error: SchedulingError) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn from_error(error: SchedulingError) -> Self {
        Self::failure_with(error.to_string(), error)
    }

    pub fn with_operation(mut self, operation: ScheduleOperation) -> Self {
        self.operation = operation;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_coverage_lost(mut self, lost: bool) -> Self {
        self.coverage_lost = lost;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Aggregate engine-side state of a schedule's jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleJobStatus {
    Enabled,
    Disabled,
    NotFound,
}

/// Status plus next fire time of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStatusInfo {
    pub status: ScheduleJobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_execution: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = ScheduleResult::success(vec![JobKey::from_raw("schedule-a")]);
        assert!(result.is_success());
        assert_eq!(result.job_ids.len(), 1);
        assert!(result.error.is_none());
        assert!(!result.coverage_lost);
    }

    #[test]
    fn test_failure_result() {
        let result = ScheduleResult::failure("boom").with_operation(ScheduleOperation::Update);
        assert!(!result.is_success());
        assert_eq!(result.message.as_deref(), Some("boom"));
        assert_eq!(result.operation, ScheduleOperation::Update);
    }

    #[test]
    fn test_from_error_keeps_error() {
        let result = ScheduleResult::from_error(SchedulingError::Cancelled);
        assert!(!result.success);
        assert!(matches!(result.error, Some(SchedulingError::Cancelled)));
        assert_eq!(result.message.as_deref(), Some("Operation cancelled"));
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(ScheduleOperation::Disable.to_string(), "disable");
    }
}
