use super::*;
use crate::memory::MemoryEngine;
use chrono::Duration;
use topicron_protocols::{FiredJob, ScheduleEventType, TriggerInfo};

fn topics(names: &[&str]) -> Vec<Topic> {
    names.iter().map(|n| Topic::from(*n)).collect()
}

fn nine_thirty() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap()
}

fn create_scheduler() -> (Arc<MemoryEngine>, EngineScheduler) {
    let engine = Arc::new(MemoryEngine::new());
    let scheduler = EngineScheduler::new(engine.clone());
    (engine, scheduler)
}

#[tokio::test]
async fn test_daily_registers_single_bulk_job() {
    let (engine, scheduler) = create_scheduler();
    let trigger = ScheduleEventTrigger::new(Uuid::new_v4(), ScheduleEventType::Start);
    let cancel = CancellationToken::new();

    let keys = scheduler
        .schedule_daily(&topics(&["a", "b", "c"]), &trigger, nine_thirty(), &cancel)
        .await
        .unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(engine.len(), 1);

    let data = engine.job_data(&keys[0]).await.unwrap().unwrap();
    assert_eq!(data.topics().unwrap(), topics(&["a", "b", "c"]));
    assert_eq!(data.get(JobData::ORIGINAL_TOPIC_COUNT), Some("3"));
}

#[tokio::test]
async fn test_daily_without_topics_registers_nothing() {
    let (engine, scheduler) = create_scheduler();
    let trigger = ScheduleEventTrigger::new(Uuid::new_v4(), ScheduleEventType::Start);

    let keys = scheduler
        .schedule_daily(&[], &trigger, nine_thirty(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(keys.is_empty());
    assert!(engine.is_empty());
}

#[tokio::test]
async fn test_week_days_registers_one_job_per_topic() {
    let (engine, scheduler) = create_scheduler();
    let schedule_id = Uuid::new_v4();
    let trigger = ScheduleEventTrigger::new(schedule_id, ScheduleEventType::End);

    let keys = scheduler
        .schedule_week_days(
            &topics(&["orders", "billing"]),
            &trigger,
            nine_thirty(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(keys.len(), 2);

    for key in &keys {
        assert!(key.belongs_to(schedule_id));
        assert_eq!(key.event_type(), Some(ScheduleEventType::End));
        let data = engine.job_data(key).await.unwrap().unwrap();
        assert_eq!(data.topics().unwrap().len(), 1);
        assert_eq!(data.get(JobData::ORIGINAL_TOPIC_COUNT), Some("2"));

        let info = engine.trigger_info(key).await.unwrap().unwrap();
        assert_eq!(
            info.spec,
            TriggerSpec::Cron {
                expression: "0 30 9 * * MON-FRI".to_string()
            }
        );
    }
}

#[tokio::test]
async fn test_selected_days_empty_rejected_before_engine() {
    let (engine, scheduler) = create_scheduler();
    let trigger = ScheduleEventTrigger::new(Uuid::new_v4(), ScheduleEventType::Start);

    let err = scheduler
        .schedule_selected_days(
            &topics(&["a"]),
            &trigger,
            nine_thirty(),
            &[],
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Validation(_)));
    assert!(engine.is_empty());
}

#[tokio::test]
async fn test_invalid_cron_rejected() {
    let (engine, scheduler) = create_scheduler();
    let trigger = ScheduleEventTrigger::new(Uuid::new_v4(), ScheduleEventType::Once);

    let err = scheduler
        .schedule_cron(&topics(&["a"]), &trigger, "0 99 * * * *", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Cron { .. }));
    assert!(engine.is_empty());
}

#[tokio::test]
async fn test_cancelled_token_registers_nothing() {
    let (engine, scheduler) = create_scheduler();
    let trigger = ScheduleEventTrigger::new(Uuid::new_v4(), ScheduleEventType::Once);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = scheduler
        .schedule_once(&topics(&["a", "b"]), &trigger, Utc::now(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Cancelled));
    assert!(engine.is_empty());
}

/// Engine that cancels the caller's token after the first registration.
struct CancelAfterFirst {
    inner: MemoryEngine,
    cancel: CancellationToken,
}

#[async_trait]
impl JobEngine for CancelAfterFirst {
    fn name(&self) -> &str {
        "cancel-after-first"
    }

    async fn add_job(&self, job: JobDetail, spec: TriggerSpec) -> Result<TriggerInfo, EngineError> {
        let info = self.inner.add_job(job, spec).await?;
        self.cancel.cancel();
        Ok(info)
    }

    async fn delete_job(&self, key: &JobKey) -> Result<bool, EngineError> {
        self.inner.delete_job(key).await
    }

    async fn pause_job(&self, key: &JobKey) -> Result<(), EngineError> {
        self.inner.pause_job(key).await
    }

    async fn resume_job(&self, key: &JobKey) -> Result<(), EngineError> {
        self.inner.resume_job(key).await
    }

    async fn job_keys(&self) -> Result<Vec<JobKey>, EngineError> {
        self.inner.job_keys().await
    }

    async fn job_data(&self, key: &JobKey) -> Result<Option<JobData>, EngineError> {
        self.inner.job_data(key).await
    }

    async fn trigger_info(&self, key: &JobKey) -> Result<Option<TriggerInfo>, EngineError> {
        self.inner.trigger_info(key).await
    }

    async fn acquire_due(&self, now: DateTime<Utc>) -> Result<Vec<FiredJob>, EngineError> {
        self.inner.acquire_due(now).await
    }

    async fn complete(&self, key: &JobKey) -> Result<(), EngineError> {
        self.inner.complete(key).await
    }
}

#[tokio::test]
async fn test_cancel_midway_keeps_partial_jobs() {
    let cancel = CancellationToken::new();
    let engine = Arc::new(CancelAfterFirst {
        inner: MemoryEngine::new(),
        cancel: cancel.clone(),
    });
    let scheduler = EngineScheduler::new(engine.clone());
    let schedule_id = Uuid::new_v4();
    let trigger = ScheduleEventTrigger::new(schedule_id, ScheduleEventType::Start);

    let err = scheduler
        .schedule_week_days(&topics(&["a", "b", "c"]), &trigger, nine_thirty(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Cancelled));

    // The first topic was registered before cancellation and is not rolled back.
    let keys = scheduler.job_keys_for_schedule(schedule_id).await.unwrap();
    assert_eq!(keys.len(), 1);
}

#[tokio::test]
async fn test_status_transitions() {
    let (engine, scheduler) = create_scheduler();
    let schedule_id = Uuid::new_v4();
    let cancel = CancellationToken::new();

    assert_eq!(
        scheduler.schedule_status(schedule_id).await.unwrap(),
        ScheduleJobStatus::NotFound
    );

    let start = ScheduleEventTrigger::new(schedule_id, ScheduleEventType::Start);
    let keys = scheduler
        .schedule_week_days(&topics(&["a", "b"]), &start, nine_thirty(), &cancel)
        .await
        .unwrap();
    assert_eq!(
        scheduler.schedule_status(schedule_id).await.unwrap(),
        ScheduleJobStatus::Enabled
    );
    assert!(scheduler.is_schedule_active(schedule_id).await.unwrap());

    assert_eq!(scheduler.pause_job(schedule_id).await.unwrap(), 2);
    assert_eq!(
        scheduler.schedule_status(schedule_id).await.unwrap(),
        ScheduleJobStatus::Disabled
    );
    assert!(!scheduler.is_schedule_active(schedule_id).await.unwrap());

    // One normal trigger is enough for Enabled.
    engine.resume_job(&keys[0]).await.unwrap();
    assert_eq!(
        scheduler.schedule_status(schedule_id).await.unwrap(),
        ScheduleJobStatus::Enabled
    );

    assert_eq!(scheduler.resume_job(schedule_id).await.unwrap(), 2);
    assert_eq!(
        scheduler.schedule_status(schedule_id).await.unwrap(),
        ScheduleJobStatus::Enabled
    );
}

#[tokio::test]
async fn test_past_once_is_not_found_rather_than_disabled() {
    let (engine, scheduler) = create_scheduler();
    let schedule_id = Uuid::new_v4();
    let trigger = ScheduleEventTrigger::new(schedule_id, ScheduleEventType::Once);

    let keys = scheduler
        .schedule_once(
            &topics(&["a", "b"]),
            &trigger,
            Utc::now() - Duration::hours(2),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(keys.is_empty());
    assert!(engine.is_empty());
    assert_eq!(
        scheduler.schedule_status(schedule_id).await.unwrap(),
        ScheduleJobStatus::NotFound
    );
}

#[tokio::test]
async fn test_status_ignores_finished_triggers() {
    let (engine, scheduler) = create_scheduler();
    let schedule_id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    let at = Utc::now() + Duration::seconds(5);

    let start = ScheduleEventTrigger::new(schedule_id, ScheduleEventType::Start);
    let end = ScheduleEventTrigger::new(schedule_id, ScheduleEventType::End);
    let once = scheduler
        .schedule_once(&topics(&["a"]), &start, at, &cancel)
        .await
        .unwrap();
    scheduler
        .schedule_week_days(&topics(&["a"]), &end, nine_thirty(), &cancel)
        .await
        .unwrap();

    // The one-shot fires and stays in flight, so its trigger reads Complete.
    let fired = engine.acquire_due(at + Duration::seconds(1)).await.unwrap();
    assert!(fired.iter().any(|job| job.job_key == once[0]));
    assert_eq!(
        scheduler.schedule_status(schedule_id).await.unwrap(),
        ScheduleJobStatus::Enabled
    );

    scheduler.pause_job(schedule_id).await.unwrap();
    assert_eq!(
        scheduler.schedule_status(schedule_id).await.unwrap(),
        ScheduleJobStatus::Disabled
    );

    // Once the one-shot completes it is gone entirely.
    engine.complete(&once[0]).await.unwrap();
    assert!(engine.trigger_info(&once[0]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_next_execution_time_is_minimum() {
    let (_engine, scheduler) = create_scheduler();
    let schedule_id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    let soon = Utc::now() + Duration::hours(1);
    let later = Utc::now() + Duration::hours(5);

    let start = ScheduleEventTrigger::new(schedule_id, ScheduleEventType::Start);
    let end = ScheduleEventTrigger::new(schedule_id, ScheduleEventType::End);
    scheduler
        .schedule_once(&topics(&["a"]), &end, later, &cancel)
        .await
        .unwrap();
    scheduler
        .schedule_once(&topics(&["a"]), &start, soon, &cancel)
        .await
        .unwrap();

    assert_eq!(
        scheduler.next_execution_time(schedule_id).await.unwrap(),
        Some(soon)
    );

    scheduler.pause_job(schedule_id).await.unwrap();
    assert_eq!(scheduler.next_execution_time(schedule_id).await.unwrap(), None);
}

#[tokio::test]
async fn test_unschedule_all_clears_index() {
    let (engine, scheduler) = create_scheduler();
    let schedule_id = Uuid::new_v4();
    let trigger = ScheduleEventTrigger::new(schedule_id, ScheduleEventType::Once);

    let keys = scheduler
        .schedule_once(
            &topics(&["a", "b"]),
            &trigger,
            Utc::now() + Duration::hours(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(scheduler.unschedule_all(&keys).await.unwrap(), 2);
    assert!(engine.is_empty());
    assert!(scheduler
        .job_keys_for_schedule(schedule_id)
        .await
        .unwrap()
        .is_empty());
    assert!(!scheduler.unschedule(&keys[0]).await.unwrap());
}

#[tokio::test]
async fn test_job_keys_fall_back_to_scan() {
    let engine: Arc<MemoryEngine> = Arc::new(MemoryEngine::new());
    let first = EngineScheduler::new(engine.clone());
    let schedule_id = Uuid::new_v4();
    let other_id = Uuid::new_v4();
    let cancel = CancellationToken::new();

    let keys = first
        .schedule_week_days(
            &topics(&["a", "b"]),
            &ScheduleEventTrigger::new(schedule_id, ScheduleEventType::Start),
            nine_thirty(),
            &cancel,
        )
        .await
        .unwrap();
    first
        .schedule_week_days(
            &topics(&["a"]),
            &ScheduleEventTrigger::new(other_id, ScheduleEventType::Start),
            nine_thirty(),
            &cancel,
        )
        .await
        .unwrap();

    // A second scheduler over the same engine starts with an empty index.
    let second = EngineScheduler::new(engine.clone());
    let mut expected = keys.clone();
    expected.sort();
    assert_eq!(second.job_keys_for_schedule(schedule_id).await.unwrap(), expected);
}

#[tokio::test]
async fn test_scan_uses_job_data_for_foreign_keys() {
    let engine = Arc::new(MemoryEngine::new());
    let schedule_id = Uuid::new_v4();
    let key = JobKey::from_raw("legacy-job-1");
    let mut data = JobData::new();
    data.insert(JobData::SCHEDULE_ID, schedule_id.to_string());
    engine
        .add_job(
            JobDetail::new(key.clone(), data),
            TriggerSpec::Daily { hour: 1, minute: 0 },
        )
        .await
        .unwrap();

    let scheduler = EngineScheduler::new(engine);
    assert_eq!(
        scheduler.job_keys_for_schedule(schedule_id).await.unwrap(),
        vec![key]
    );
}

#[tokio::test]
async fn test_rebuild_index() {
    let engine = Arc::new(MemoryEngine::new());
    let first = EngineScheduler::new(engine.clone());
    first
        .schedule_daily(
            &topics(&["a"]),
            &ScheduleEventTrigger::new(Uuid::new_v4(), ScheduleEventType::Start),
            nine_thirty(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let second = EngineScheduler::new(engine);
    assert_eq!(second.rebuild_index().await.unwrap(), 1);
}
