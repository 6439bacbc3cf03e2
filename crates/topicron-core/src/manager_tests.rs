use super::*;
use chrono::{Duration, Utc};
use topicron_protocols::{
    ResourceRepository, ScheduleJobStatus, ScheduleRepository, ScheduleSubType, ScheduleType,
    UnifiedScheduler,
};
use topicron_store::{MemoryResourceRepository, MemoryScheduleRepository};

use crate::registry::StrategyRegistry;
use crate::test_support::{at, memory_scheduler, topics};
use topicron_engine::EngineScheduler;

struct Fixture {
    schedule_repo: Arc<MemoryScheduleRepository>,
    resource_repo: Arc<MemoryResourceRepository>,
    scheduler: Arc<EngineScheduler>,
    manager: ScheduleManager,
}

fn fixture() -> Fixture {
    let schedule_repo = Arc::new(MemoryScheduleRepository::new());
    let resource_repo = Arc::new(MemoryResourceRepository::new());
    let (_, scheduler) = memory_scheduler();
    let manager = manager_over(&schedule_repo, &resource_repo, &scheduler);
    Fixture {
        schedule_repo,
        resource_repo,
        scheduler,
        manager,
    }
}

fn manager_over(
    schedule_repo: &Arc<MemoryScheduleRepository>,
    resource_repo: &Arc<MemoryResourceRepository>,
    scheduler: &Arc<EngineScheduler>,
) -> ScheduleManager {
    let resources = Arc::new(ResourceCache::new(resource_repo.clone()));
    let schedules = Arc::new(ScheduleCache::new(schedule_repo.clone(), resources));
    let events = ScheduleEventService::new(
        Arc::new(StrategyRegistry::with_defaults()),
        scheduler.clone(),
    );
    ScheduleManager::new(schedules, events)
}

fn weekdays() -> Schedule {
    Schedule::new("office", ScheduleType::Weekly, at(8, 0))
        .with_end(at(17, 0))
        .with_sub_type(ScheduleSubType::Weekdays)
}

async fn job_count(scheduler: &EngineScheduler, schedule_id: Uuid) -> usize {
    scheduler.job_keys_for_schedule(schedule_id).await.unwrap().len()
}

#[tokio::test]
async fn test_create_persists_and_registers() {
    let f = fixture();
    let schedule = weekdays();
    let cancel = CancellationToken::new();

    let result = f
        .manager
        .create(schedule.clone(), &topics(&["orders", "billing"]), &cancel)
        .await
        .unwrap();
    assert!(result.is_success());
    assert_eq!(result.job_ids.len(), 4);

    let detail = f.manager.detail(schedule.id).unwrap();
    assert_eq!(detail.schedule, schedule);
    assert_eq!(detail.attached_resources.len(), 2);
    assert!(f.schedule_repo.get(schedule.id).await.unwrap().is_some());
    assert_eq!(f.resource_repo.get_by_schedule(schedule.id).await.unwrap().len(), 2);

    let status = f.manager.status(schedule.id).await.unwrap();
    assert_eq!(status.status, ScheduleJobStatus::Enabled);
}

#[tokio::test]
async fn test_invalid_create_is_not_persisted() {
    let f = fixture();
    let schedule = Schedule::new("bad", ScheduleType::Daily, at(10, 0)).with_end(at(9, 0));

    let result = f
        .manager
        .create(schedule.clone(), &topics(&["orders"]), &CancellationToken::new())
        .await
        .unwrap();
    assert!(!result.is_success());
    assert!(f.manager.schedule(schedule.id).is_none());
    assert!(f.schedule_repo.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_attach_and_detach_reschedule() {
    let f = fixture();
    let schedule = weekdays();
    let cancel = CancellationToken::new();

    f.manager
        .create(schedule.clone(), &topics(&["orders"]), &cancel)
        .await
        .unwrap();
    assert_eq!(job_count(&f.scheduler, schedule.id).await, 2);

    let attached = f
        .manager
        .attach(schedule.id, Topic::from("billing"), &cancel)
        .await
        .unwrap();
    assert!(attached.is_success());
    assert_eq!(job_count(&f.scheduler, schedule.id).await, 4);

    let billing = f
        .manager
        .attachments(schedule.id)
        .into_iter()
        .find(|m| m.resource_id == "billing")
        .unwrap();
    let detached = f.manager.detach(billing.id, &cancel).await.unwrap();
    assert!(detached.is_success());

    let remaining: Vec<String> = f
        .manager
        .attachments(schedule.id)
        .into_iter()
        .map(|m| m.resource_id)
        .collect();
    assert_eq!(remaining, vec!["orders"]);
    assert_eq!(job_count(&f.scheduler, schedule.id).await, 2);
}

#[tokio::test]
async fn test_attach_to_unknown_schedule() {
    let f = fixture();
    let result = f
        .manager
        .attach(Uuid::new_v4(), Topic::from("orders"), &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(result.error, Some(SchedulingError::NotFound(_))));

    let err = f
        .manager
        .attach(Uuid::nil(), Topic::from("orders"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Precondition(_)));
}

#[tokio::test]
async fn test_delete_removes_everything() {
    let f = fixture();
    let schedule = weekdays();
    let cancel = CancellationToken::new();
    f.manager
        .create(schedule.clone(), &topics(&["orders"]), &cancel)
        .await
        .unwrap();

    let result = f.manager.delete(schedule.id).await.unwrap();
    assert!(result.is_success());
    assert!(f.manager.detail(schedule.id).is_none());
    assert!(f.manager.attachments(schedule.id).is_empty());
    assert_eq!(job_count(&f.scheduler, schedule.id).await, 0);

    let again = f.manager.delete(schedule.id).await.unwrap();
    assert!(!again.is_success());
}

#[tokio::test]
async fn test_disable_and_enable_persist_status() {
    let f = fixture();
    let schedule = weekdays();
    f.manager
        .create(schedule.clone(), &topics(&["orders"]), &CancellationToken::new())
        .await
        .unwrap();

    let disabled = f.manager.disable(schedule.id).await.unwrap();
    assert!(disabled.is_success());
    assert!(!f.manager.schedule(schedule.id).unwrap().is_enabled());
    assert_eq!(
        f.manager.status(schedule.id).await.unwrap().status,
        ScheduleJobStatus::Disabled
    );

    f.manager.enable(schedule.id).await.unwrap();
    assert!(f.schedule_repo.get(schedule.id).await.unwrap().unwrap().is_enabled());
    assert_eq!(
        f.manager.status(schedule.id).await.unwrap().status,
        ScheduleJobStatus::Enabled
    );
}

#[tokio::test]
async fn test_update_unknown_schedule() {
    let f = fixture();
    let result = f
        .manager
        .update(weekdays(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.operation, ScheduleOperation::Update);
    assert!(matches!(result.error, Some(SchedulingError::NotFound(_))));
}

#[tokio::test]
async fn test_start_syncs_engine_with_store() {
    let f = fixture();
    let enabled = weekdays();
    let disabled = weekdays().with_status(ScheduleStatus::Disabled);
    for s in [&enabled, &disabled] {
        f.schedule_repo.add(s).await.unwrap();
        f.resource_repo
            .add(&ResourceAttachment::topic(s.id, "orders"))
            .await
            .unwrap();
    }

    let cancel = CancellationToken::new();
    let report = f.manager.start(&cancel).await.unwrap();
    assert_eq!(report.schedules, 2);
    assert_eq!(report.registered, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(
        f.manager.status(disabled.id).await.unwrap().status,
        ScheduleJobStatus::Disabled
    );

    // A second process over the same engine finds the jobs in place.
    let second = manager_over(&f.schedule_repo, &f.resource_repo, &f.scheduler);
    let report = second.start(&cancel).await.unwrap();
    assert_eq!(report.registered, 0);
    assert_eq!(job_count(&f.scheduler, enabled.id).await, 2);
}

#[tokio::test]
async fn test_start_pauses_jobs_of_disabled_schedule() {
    let f = fixture();
    let schedule = weekdays();
    let cancel = CancellationToken::new();
    f.manager
        .create(schedule.clone(), &topics(&["orders"]), &cancel)
        .await
        .unwrap();

    // Disabled directly in the store, behind the engine's back.
    let mut stored = schedule.clone();
    stored.status = ScheduleStatus::Disabled;
    f.schedule_repo.update(&stored).await.unwrap();

    let second = manager_over(&f.schedule_repo, &f.resource_repo, &f.scheduler);
    let report = second.start(&cancel).await.unwrap();
    assert_eq!(report.paused, 1);
    assert!(!f.scheduler.is_schedule_active(schedule.id).await.unwrap());
}

#[tokio::test]
async fn test_start_leaves_finished_date_wise_schedule_alone() {
    let f = fixture();
    let start = Utc::now() - Duration::days(2);
    let schedule =
        Schedule::new("launch", ScheduleType::DateWise, start).with_end(start + Duration::hours(4));
    f.schedule_repo.add(&schedule).await.unwrap();
    f.resource_repo
        .add(&ResourceAttachment::topic(schedule.id, "orders"))
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    for _ in 0..2 {
        let report = f.manager.start(&cancel).await.unwrap();
        assert_eq!(report.registered, 0);
        assert_eq!(report.resumed, 0);
        assert_eq!(report.failed, 0);
    }

    assert_eq!(job_count(&f.scheduler, schedule.id).await, 0);
    assert_eq!(
        f.scheduler.schedule_status(schedule.id).await.unwrap(),
        ScheduleJobStatus::NotFound
    );
}
