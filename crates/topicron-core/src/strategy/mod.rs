//! Recurrence strategies.
//!
//! A strategy turns a schedule into a plan: the lifecycle events to fire
//! and the recurrence each one uses. Registering that plan, updating,
//! deleting, pausing and resuming are shared and go through the
//! [`UnifiedScheduler`] only, so strategies never see the backend engine.

mod custom;
mod daily;
mod date_wise;
mod monthly;
mod update;
mod weekly;
mod yearly;

pub use custom::CustomStrategy;
pub use daily::DailyStrategy;
pub use date_wise::DateWiseStrategy;
pub use monthly::MonthlyStrategy;
pub use weekly::WeeklyStrategy;
pub use yearly::YearlyStrategy;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use topicron_protocols::{
    Day, JobKey, Schedule, ScheduleEventTrigger, ScheduleEventType, ScheduleResult,
    ScheduleType, SchedulingError, Topic, UnifiedScheduler, UpdatePolicy,
};

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;

/// How a single lifecycle event recurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Daily(NaiveTime),
    WeekDays(NaiveTime),
    WeekendDays(NaiveTime),
    SelectedDays(NaiveTime, Vec<Day>),
    DateWise(DateTime<Utc>),
    Once(DateTime<Utc>),
    Monthly { day: u32, time: NaiveTime },
    Cron(String),
}

impl Recurrence {
    async fn register(
        &self,
        scheduler: &dyn UnifiedScheduler,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        match self {
            Self::Daily(time) => scheduler.schedule_daily(topics, trigger, *time, cancel).await,
            Self::WeekDays(time) => {
                scheduler
                    .schedule_week_days(topics, trigger, *time, cancel)
                    .await
            }
            Self::WeekendDays(time) => {
                scheduler
                    .schedule_weekend_days(topics, trigger, *time, cancel)
                    .await
            }
            Self::SelectedDays(time, days) => {
                scheduler
                    .schedule_selected_days(topics, trigger, *time, days, cancel)
                    .await
            }
            Self::DateWise(at) => {
                scheduler
                    .schedule_date_wise(topics, trigger, *at, cancel)
                    .await
            }
            Self::Once(at) => scheduler.schedule_once(topics, trigger, *at, cancel).await,
            Self::Monthly { day, time } => {
                scheduler
                    .schedule_monthly(topics, trigger, *day, *time, cancel)
                    .await
            }
            Self::Cron(expression) => {
                scheduler
                    .schedule_cron(topics, trigger, expression, cancel)
                    .await
            }
        }
    }
}

/// One event of a strategy's plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEvent {
    pub event_type: ScheduleEventType,
    pub recurrence: Recurrence,
}

impl PlannedEvent {
    pub fn new(event_type: ScheduleEventType, recurrence: Recurrence) -> Self {
        Self {
            event_type,
            recurrence,
        }
    }
}

/// Plan a Start and an End event, or a single Once event when the schedule
/// has no end. An End identical to its Start is dropped.
pub(crate) fn start_and_end<F>(
    schedule: &Schedule,
    build: F,
) -> Result<Vec<PlannedEvent>, SchedulingError>
where
    F: Fn(DateTime<Utc>) -> Result<Recurrence, SchedulingError>,
{
    let start = build(schedule.start_date_time)?;

    let Some(end_at) = schedule.end_date_time else {
        return Ok(vec![PlannedEvent::new(ScheduleEventType::Once, start)]);
    };

    let end = build(end_at)?;
    let mut plan = Vec::with_capacity(2);
    if end == start {
        debug!(
            schedule_id = %schedule.id,
            "End recurrence equals start, registering start only"
        );
        plan.push(PlannedEvent::new(ScheduleEventType::Start, start));
    } else {
        plan.push(PlannedEvent::new(ScheduleEventType::Start, start));
        plan.push(PlannedEvent::new(ScheduleEventType::End, end));
    }
    Ok(plan)
}

pub(crate) fn not_implemented(schedule: &Schedule) -> SchedulingError {
    SchedulingError::NotImplemented(format!(
        "{} '{}' recurrence",
        schedule.schedule_type, schedule.sub_type
    ))
}

/// Per-recurrence job composition.
#[async_trait]
pub trait ScheduleJobStrategy: Send + Sync {
    /// The schedule type this strategy is registered under.
    fn schedule_type(&self) -> ScheduleType;

    fn description(&self) -> &'static str;

    fn can_handle(&self, schedule_type: ScheduleType) -> bool {
        schedule_type == self.schedule_type()
    }

    /// The events to register for `schedule`.
    fn plan(&self, schedule: &Schedule) -> Result<Vec<PlannedEvent>, SchedulingError>;

    /// Register every planned event, stopping at the first failure.
    ///
    /// A failed result keeps the job ids registered before the failure.
    async fn schedule_job(
        &self,
        schedule: &Schedule,
        topics: &[Topic],
        scheduler: &dyn UnifiedScheduler,
        cancel: &CancellationToken,
    ) -> ScheduleResult {
        let plan = match self.plan(schedule) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(schedule_id = %schedule.id, error = %e, "Cannot plan schedule");
                return ScheduleResult::from_error(e);
            }
        };

        let mut job_ids = Vec::new();
        for event in &plan {
            let trigger = ScheduleEventTrigger::new(schedule.id, event.event_type);
            match event
                .recurrence
                .register(scheduler, topics, &trigger, cancel)
                .await
            {
                Ok(keys) => job_ids.extend(keys),
                Err(e) => {
                    warn!(
                        schedule_id = %schedule.id,
                        event = %event.event_type,
                        error = %e,
                        "Failed to schedule event"
                    );
                    let mut result = ScheduleResult::failure_with(
                        format!(
                            "Failed to schedule {} event for schedule {}: {}",
                            event.event_type, schedule.id, e
                        ),
                        e,
                    );
                    result.job_ids = job_ids;
                    return result;
                }
            }
        }

        info!(
            schedule_id = %schedule.id,
            schedule_type = %schedule.schedule_type,
            events = plan.len(),
            "Scheduled {} job(s)",
            job_ids.len()
        );
        ScheduleResult::success(job_ids)
    }

    /// Replace a schedule's jobs with ones built from its current definition.
    async fn update_job(
        &self,
        schedule: &Schedule,
        topics: &[Topic],
        scheduler: &dyn UnifiedScheduler,
        policy: UpdatePolicy,
        cancel: &CancellationToken,
    ) -> ScheduleResult {
        update::update_jobs(self, schedule, topics, scheduler, policy, cancel).await
    }

    /// Remove every job of a schedule.
    async fn delete_job(
        &self,
        schedule_id: Uuid,
        scheduler: &dyn UnifiedScheduler,
    ) -> ScheduleResult {
        let keys = match scheduler.job_keys_for_schedule(schedule_id).await {
            Ok(keys) => keys,
            Err(e) => {
                return ScheduleResult::failure_with(
                    format!("Failed to look up jobs for schedule {}", schedule_id),
                    e,
                );
            }
        };

        if keys.is_empty() {
            debug!(%schedule_id, "No jobs to delete");
            return ScheduleResult::success(Vec::new());
        }

        match scheduler.unschedule_all(&keys).await {
            Ok(removed) => {
                if removed < keys.len() {
                    debug!(
                        %schedule_id,
                        "{} of {} job(s) were already gone",
                        keys.len() - removed,
                        keys.len()
                    );
                }
                ScheduleResult::success(keys)
            }
            Err(e) => ScheduleResult::failure_with(
                format!("Failed to delete jobs for schedule {}", schedule_id),
                e,
            ),
        }
    }

    /// Resume every job of a schedule.
    async fn enable_job(
        &self,
        schedule_id: Uuid,
        scheduler: &dyn UnifiedScheduler,
    ) -> ScheduleResult {
        match scheduler.resume_job(schedule_id).await {
            Ok(resumed) => ScheduleResult::success(Vec::new())
                .with_message(format!("Resumed {} job(s)", resumed)),
            Err(e) => ScheduleResult::failure_with(
                format!("Failed to enable schedule {}", schedule_id),
                e,
            ),
        }
    }

    /// Pause every job of a schedule.
    async fn disable_job(
        &self,
        schedule_id: Uuid,
        scheduler: &dyn UnifiedScheduler,
    ) -> ScheduleResult {
        match scheduler.pause_job(schedule_id).await {
            Ok(paused) => ScheduleResult::success(Vec::new())
                .with_message(format!("Paused {} job(s)", paused)),
            Err(e) => ScheduleResult::failure_with(
                format!("Failed to disable schedule {}", schedule_id),
                e,
            ),
        }
    }
}
