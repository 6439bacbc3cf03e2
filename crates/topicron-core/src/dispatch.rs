//! Schedule event dispatch service.
//!
//! Every operation follows the same path: validate, resolve the strategy
//! for the schedule type, run it against the unified scheduler and log the
//! outcome. Expected failures come back as a failed [`ScheduleResult`];
//! precondition violations and a missing strategy are returned as `Err`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use topicron_protocols::{
    Schedule, ScheduleJobStatus, ScheduleOperation, ScheduleResult, ScheduleStatusInfo,
    SchedulingError, Topic, UnifiedScheduler, UpdatePolicy,
};

use crate::registry::StrategyRegistry;
use crate::validator::{check_topics, validate_schedule};

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;

pub struct ScheduleEventService {
    strategies: Arc<StrategyRegistry>,
    scheduler: Arc<dyn UnifiedScheduler>,
    update_policy: UpdatePolicy,
}

impl ScheduleEventService {
    pub fn new(strategies: Arc<StrategyRegistry>, scheduler: Arc<dyn UnifiedScheduler>) -> Self {
        Self {
            strategies,
            scheduler,
            update_policy: UpdatePolicy::default(),
        }
    }

    pub fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }

    pub fn update_policy(&self) -> UpdatePolicy {
        self.update_policy
    }

    pub fn scheduler(&self) -> &Arc<dyn UnifiedScheduler> {
        &self.scheduler
    }

    /// Register jobs for a new schedule. A disabled schedule gets paused jobs.
    pub async fn create(
        &self,
        schedule: &Schedule,
        topics: &[Topic],
        cancel: &CancellationToken,
    ) -> Result<ScheduleResult, SchedulingError> {
        let op = ScheduleOperation::Create;
        check_topics(topics)?;
        if let Some(rejected) = Self::rejected(schedule, op) {
            return Ok(rejected);
        }

        let strategy = self.strategies.get_strategy(schedule.schedule_type)?;
        let result = strategy
            .schedule_job(schedule, topics, self.scheduler.as_ref(), cancel)
            .await
            .with_operation(op);
        let result = self.park_if_disabled(schedule, result).await;

        Ok(Self::logged(schedule.id, result))
    }

    /// Replace a schedule's jobs using the configured update policy.
    pub async fn update(
        &self,
        schedule: &Schedule,
        topics: &[Topic],
        cancel: &CancellationToken,
    ) -> Result<ScheduleResult, SchedulingError> {
        let op = ScheduleOperation::Update;
        check_topics(topics)?;
        if let Some(rejected) = Self::rejected(schedule, op) {
            return Ok(rejected);
        }

        let strategy = self.strategies.get_strategy(schedule.schedule_type)?;
        let result = strategy
            .update_job(
                schedule,
                topics,
                self.scheduler.as_ref(),
                self.update_policy,
                cancel,
            )
            .await
            .with_operation(op);
        let result = self.park_if_disabled(schedule, result).await;

        Ok(Self::logged(schedule.id, result))
    }

    /// Remove every job of a schedule.
    pub async fn delete(&self, schedule: &Schedule) -> Result<ScheduleResult, SchedulingError> {
        let op = ScheduleOperation::Delete;
        if let Some(rejected) = Self::nil_id(schedule, op) {
            return Ok(rejected);
        }

        let strategy = self.strategies.get_strategy(schedule.schedule_type)?;
        let result = strategy
            .delete_job(schedule.id, self.scheduler.as_ref())
            .await
            .with_operation(op);

        Ok(Self::logged(schedule.id, result))
    }

    /// Resume every job of a schedule.
    pub async fn enable(&self, schedule: &Schedule) -> Result<ScheduleResult, SchedulingError> {
        let op = ScheduleOperation::Enable;
        if let Some(rejected) = Self::nil_id(schedule, op) {
            return Ok(rejected);
        }

        let strategy = self.strategies.get_strategy(schedule.schedule_type)?;
        let result = strategy
            .enable_job(schedule.id, self.scheduler.as_ref())
            .await
            .with_operation(op);

        Ok(Self::logged(schedule.id, result))
    }

    /// Pause every job of a schedule.
    pub async fn disable(&self, schedule: &Schedule) -> Result<ScheduleResult, SchedulingError> {
        let op = ScheduleOperation::Disable;
        if let Some(rejected) = Self::nil_id(schedule, op) {
            return Ok(rejected);
        }

        let strategy = self.strategies.get_strategy(schedule.schedule_type)?;
        let result = strategy
            .disable_job(schedule.id, self.scheduler.as_ref())
            .await
            .with_operation(op);

        Ok(Self::logged(schedule.id, result))
    }

    /// Engine-side status and next fire time. `NotFound` when the schedule has no jobs.
    pub async fn schedule_status(
        &self,
        schedule_id: Uuid,
    ) -> Result<ScheduleStatusInfo, SchedulingError> {
        let status = self.scheduler.schedule_status(schedule_id).await?;
        if status == ScheduleJobStatus::NotFound {
            return Err(SchedulingError::NotFound(format!(
                "No jobs found for schedule {}",
                schedule_id
            )));
        }

        let next_execution = self.scheduler.next_execution_time(schedule_id).await?;
        Ok(ScheduleStatusInfo {
            status,
            next_execution,
        })
    }

    pub async fn is_schedule_enabled(&self, schedule_id: Uuid) -> Result<bool, SchedulingError> {
        self.scheduler.is_schedule_active(schedule_id).await
    }

    /// Whether the engine holds any job for the schedule.
    pub async fn schedule_exists(&self, schedule_id: Uuid) -> Result<bool, SchedulingError> {
        Ok(!self
            .scheduler
            .job_keys_for_schedule(schedule_id)
            .await?
            .is_empty())
    }

    fn rejected(schedule: &Schedule, op: ScheduleOperation) -> Option<ScheduleResult> {
        let e = validate_schedule(schedule).err()?;
        error!(schedule_id = %schedule.id, %op, error = %e, "Schedule validation failed");
        Some(ScheduleResult::from_error(e).with_operation(op))
    }

    fn nil_id(schedule: &Schedule, op: ScheduleOperation) -> Option<ScheduleResult> {
        if !schedule.id.is_nil() {
            return None;
        }
        let e = SchedulingError::Validation("schedule id must not be nil".to_string());
        Some(ScheduleResult::from_error(e).with_operation(op))
    }

    async fn park_if_disabled(&self, schedule: &Schedule, result: ScheduleResult) -> ScheduleResult {
        if !result.success || schedule.is_enabled() {
            return result;
        }

        match self.scheduler.pause_job(schedule.id).await {
            Ok(paused) => {
                info!(schedule_id = %schedule.id, paused, "Schedule is disabled, jobs paused");
                result
            }
            Err(e) => {
                let job_ids = result.job_ids;
                let mut failed = ScheduleResult::failure_with(
                    format!("Jobs registered but schedule {} could not be paused", schedule.id),
                    e,
                )
                .with_operation(result.operation);
                failed.job_ids = job_ids;
                failed
            }
        }
    }

    fn logged(schedule_id: Uuid, result: ScheduleResult) -> ScheduleResult {
        let op = result.operation;
        if result.success {
            info!(%schedule_id, %op, jobs = result.job_ids.len(), "Schedule operation succeeded");
        } else {
            warn!(
                %schedule_id,
                %op,
                coverage_lost = result.coverage_lost,
                message = result.message.as_deref().unwrap_or_default(),
                "Schedule operation failed"
            );
        }
        result
    }
}
