//! Job replacement on schedule update.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use topicron_protocols::{
    JobKey, Schedule, ScheduleResult, Topic, UnifiedScheduler, UpdatePolicy,
};

use super::ScheduleJobStrategy;

pub(super) async fn update_jobs<S>(
    strategy: &S,
    schedule: &Schedule,
    topics: &[Topic],
    scheduler: &dyn UnifiedScheduler,
    policy: UpdatePolicy,
    cancel: &CancellationToken,
) -> ScheduleResult
where
    S: ScheduleJobStrategy + ?Sized,
{
    let existing = match scheduler.job_keys_for_schedule(schedule.id).await {
        Ok(keys) => keys,
        Err(e) => {
            return ScheduleResult::failure_with(
                format!("Failed to look up jobs for schedule {}", schedule.id),
                e,
            );
        }
    };

    match policy {
        UpdatePolicy::ReplaceThenRemove => {
            replace_then_remove(strategy, schedule, topics, scheduler, existing, cancel).await
        }
        UpdatePolicy::DeleteThenRecreate => {
            delete_then_recreate(strategy, schedule, topics, scheduler, existing, cancel).await
        }
    }
}

async fn replace_then_remove<S>(
    strategy: &S,
    schedule: &Schedule,
    topics: &[Topic],
    scheduler: &dyn UnifiedScheduler,
    existing: Vec<JobKey>,
    cancel: &CancellationToken,
) -> ScheduleResult
where
    S: ScheduleJobStrategy + ?Sized,
{
    let created = strategy
        .schedule_job(schedule, topics, scheduler, cancel)
        .await;

    if !created.success {
        let keep: HashSet<JobKey> = existing.into_iter().collect();
        let rolled_back = remove_new_jobs(scheduler, schedule.id, &keep).await;
        warn!(
            schedule_id = %schedule.id,
            rolled_back,
            kept = keep.len(),
            "Update failed, previous jobs kept"
        );
        let message = format!(
            "Update of schedule {} failed, previous jobs kept: {}",
            schedule.id,
            created.message.as_deref().unwrap_or("unknown error")
        );
        let mut result = created.with_message(message);
        result.job_ids.clear();
        return result;
    }

    if existing.is_empty() {
        return created;
    }

    match scheduler.unschedule_all(&existing).await {
        Ok(removed) => {
            info!(
                schedule_id = %schedule.id,
                added = created.job_ids.len(),
                removed,
                "Replaced schedule jobs"
            );
            created
        }
        Err(e) => {
            error!(
                schedule_id = %schedule.id,
                error = %e,
                "New jobs registered but previous jobs could not be removed"
            );
            let mut result = ScheduleResult::failure_with(
                format!(
                    "New jobs registered for schedule {} but previous jobs remain",
                    schedule.id
                ),
                e,
            );
            result.job_ids = created.job_ids;
            result
        }
    }
}

async fn delete_then_recreate<S>(
    strategy: &S,
    schedule: &Schedule,
    topics: &[Topic],
    scheduler: &dyn UnifiedScheduler,
    existing: Vec<JobKey>,
    cancel: &CancellationToken,
) -> ScheduleResult
where
    S: ScheduleJobStrategy + ?Sized,
{
    if !existing.is_empty() {
        if let Err(e) = scheduler.unschedule_all(&existing).await {
            return ScheduleResult::failure_with(
                format!("Failed to remove previous jobs of schedule {}", schedule.id),
                e,
            );
        }
    }

    let created = strategy
        .schedule_job(schedule, topics, scheduler, cancel)
        .await;

    if !created.success && !existing.is_empty() {
        error!(
            schedule_id = %schedule.id,
            removed = existing.len(),
            "Update failed after previous jobs were removed"
        );
        return created.with_coverage_lost(true);
    }
    created
}

/// Unschedule jobs of `schedule_id` that are not in `keep`.
async fn remove_new_jobs(
    scheduler: &dyn UnifiedScheduler,
    schedule_id: Uuid,
    keep: &HashSet<JobKey>,
) -> usize {
    let current = match scheduler.job_keys_for_schedule(schedule_id).await {
        Ok(keys) => keys,
        Err(e) => {
            error!(%schedule_id, error = %e, "Cannot list jobs to roll back");
            return 0;
        }
    };

    let fresh: Vec<JobKey> = current.into_iter().filter(|k| !keep.contains(k)).collect();
    if fresh.is_empty() {
        return 0;
    }

    match scheduler.unschedule_all(&fresh).await {
        Ok(removed) => removed,
        Err(e) => {
            error!(%schedule_id, error = %e, "Rollback of new jobs failed");
            0
        }
    }
}
