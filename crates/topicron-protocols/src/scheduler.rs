//! Unified scheduler protocol.
//!
//! Strategies talk to this trait only, so the same strategy code runs
//! against any backend job engine.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engine::JobKey;
use crate::error::SchedulingError;
use crate::resource::Topic;
use crate::result::ScheduleJobStatus;
use crate::schedule::Day;
use crate::trigger::ScheduleEventTrigger;

/// How an update replaces a schedule's registered jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Register the new jobs first, then delete the old ones. A failed
    /// registration rolls back the new jobs and keeps the old ones.
    #[default]
    ReplaceThenRemove,
    /// Delete the old jobs, then register the new ones. A failure in between
    /// leaves the schedule with no jobs.
    DeleteThenRecreate,
}

/// Backend-agnostic scheduling primitives.
///
/// Registration methods create one job per topic (the daily path creates a
/// single job carrying the whole topic list) and return the keys created.
/// Cancellation is checked before each per-topic registration; jobs already
/// registered by a cancelled call are left in place.
#[async_trait]
pub trait UnifiedScheduler: Send + Sync {
    /// Fire every day at `time`.
    async fn schedule_daily(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        time: NaiveTime,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError>;

    /// Fire Monday through Friday at `time`.
    async fn schedule_week_days(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        time: NaiveTime,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError>;

    /// Fire Saturday and Sunday at `time`.
    async fn schedule_weekend_days(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        time: NaiveTime,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError>;

    /// Fire on the given days at `time`.
    async fn schedule_selected_days(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        time: NaiveTime,
        days: &[Day],
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError>;

    /// Fire once at an absolute date and time.
    async fn schedule_date_wise(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError>;

    /// Fire once at `at`.
    async fn schedule_once(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError>;

    /// Fire every month on `day_of_month` at `time`.
    async fn schedule_monthly(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        day_of_month: u32,
        time: NaiveTime,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError>;

    /// Fire on a raw 6-field cron expression.
    async fn schedule_cron(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        expression: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError>;

    /// Delete one job. Returns false if it did not exist.
    async fn unschedule(&self, key: &JobKey) -> Result<bool, SchedulingError>;

    /// Delete several jobs. Returns how many existed.
    async fn unschedule_all(&self, keys: &[JobKey]) -> Result<usize, SchedulingError>;

    /// Pause every job of a schedule. Returns how many were paused.
    async fn pause_job(&self, schedule_id: Uuid) -> Result<usize, SchedulingError>;

    /// Resume every job of a schedule. Returns how many were resumed.
    async fn resume_job(&self, schedule_id: Uuid) -> Result<usize, SchedulingError>;

    async fn job_keys_for_schedule(&self, schedule_id: Uuid)
        -> Result<Vec<JobKey>, SchedulingError>;

    async fn schedule_status(&self, schedule_id: Uuid)
        -> Result<ScheduleJobStatus, SchedulingError>;

    /// Earliest next fire time across the schedule's triggers.
    async fn next_execution_time(
        &self,
        schedule_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, SchedulingError>;

    async fn is_schedule_active(&self, schedule_id: Uuid) -> Result<bool, SchedulingError> {
        Ok(self.schedule_status(schedule_id).await? == ScheduleJobStatus::Enabled)
    }
}
