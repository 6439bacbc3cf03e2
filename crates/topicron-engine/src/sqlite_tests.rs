use super::*;
use chrono::Duration;
use tempfile::TempDir;
use topicron_protocols::ScheduleEventType;
use uuid::Uuid;

fn job(event: ScheduleEventType) -> JobDetail {
    let key = JobKey::generate(Uuid::new_v4(), event);
    let mut data = JobData::new();
    data.insert(JobData::EVENT_TYPE, event.as_str());
    JobDetail::new(key, data)
}

#[tokio::test]
async fn test_add_and_read_back() {
    let engine = SqliteEngine::in_memory().await.unwrap();
    let detail = job(ScheduleEventType::Start);
    let key = detail.key.clone();

    let spec = TriggerSpec::Cron {
        expression: "0 0 9 * * MON-FRI".to_string(),
    };
    let info = engine.add_job(detail, spec.clone()).await.unwrap();
    assert_eq!(info.state, TriggerState::Normal);

    let stored = engine.trigger_info(&key).await.unwrap().unwrap();
    assert_eq!(stored.spec, spec);
    assert_eq!(stored.state, TriggerState::Normal);
    assert_eq!(stored.next_fire, info.next_fire);

    let data = engine.job_data(&key).await.unwrap().unwrap();
    assert_eq!(data.event_type(), Some(ScheduleEventType::Start));
    assert_eq!(engine.job_keys().await.unwrap(), vec![key]);
}

#[tokio::test]
async fn test_duplicate_job_rejected() {
    let engine = SqliteEngine::in_memory().await.unwrap();
    let detail = job(ScheduleEventType::Start);
    let spec = TriggerSpec::Daily { hour: 6, minute: 0 };

    engine.add_job(detail.clone(), spec.clone()).await.unwrap();
    let err = engine.add_job(detail, spec).await.unwrap_err();
    assert!(matches!(err, EngineError::JobExists(_)));
}

#[tokio::test]
async fn test_pause_resume_and_missing() {
    let engine = SqliteEngine::in_memory().await.unwrap();
    let detail = job(ScheduleEventType::End);
    let key = detail.key.clone();
    engine
        .add_job(detail, TriggerSpec::Daily { hour: 17, minute: 0 })
        .await
        .unwrap();

    engine.pause_job(&key).await.unwrap();
    assert_eq!(
        engine.trigger_info(&key).await.unwrap().unwrap().state,
        TriggerState::Paused
    );

    engine.resume_job(&key).await.unwrap();
    assert_eq!(
        engine.trigger_info(&key).await.unwrap().unwrap().state,
        TriggerState::Normal
    );

    let missing = JobKey::from_raw("schedule-missing");
    assert!(matches!(
        engine.pause_job(&missing).await,
        Err(EngineError::JobNotFound(_))
    ));
}

#[tokio::test]
async fn test_acquire_due_and_complete() {
    let engine = SqliteEngine::in_memory().await.unwrap();
    let at = Utc::now() + Duration::seconds(5);
    let detail = job(ScheduleEventType::Once);
    let key = detail.key.clone();
    engine.add_job(detail, TriggerSpec::Once { at }).await.unwrap();

    assert!(engine.acquire_due(Utc::now()).await.unwrap().is_empty());

    let fired = engine.acquire_due(at + Duration::seconds(1)).await.unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].job_key, key);
    assert!(!fired[0].recovering);
    assert_eq!(fired[0].data.event_type(), Some(ScheduleEventType::Once));

    assert!(engine
        .acquire_due(at + Duration::seconds(2))
        .await
        .unwrap()
        .is_empty());

    engine.complete(&key).await.unwrap();
    // Durable jobs stay registered after completion.
    assert_eq!(
        engine.trigger_info(&key).await.unwrap().unwrap().state,
        TriggerState::Complete
    );
}

#[tokio::test]
async fn test_past_non_durable_job_is_not_stored() {
    let engine = SqliteEngine::in_memory().await.unwrap();
    let mut detail = job(ScheduleEventType::Once);
    detail.durable = false;
    let key = detail.key.clone();
    let spec = TriggerSpec::Once {
        at: Utc::now() - Duration::hours(2),
    };

    let info = engine.add_job(detail.clone(), spec.clone()).await.unwrap();
    assert_eq!(info.state, TriggerState::Complete);
    assert!(engine.trigger_info(&key).await.unwrap().is_none());
    assert!(engine.job_keys().await.unwrap().is_empty());

    // Nothing was kept, so adding it again is not a duplicate.
    assert!(engine.add_job(detail, spec).await.is_ok());
}

#[tokio::test]
async fn test_misfired_non_durable_job_is_dropped() {
    let engine = SqliteEngine::in_memory().await.unwrap();
    let at = Utc::now() + Duration::seconds(5);
    let mut detail = job(ScheduleEventType::Once);
    detail.durable = false;
    let key = detail.key.clone();
    engine.add_job(detail, TriggerSpec::Once { at }).await.unwrap();

    let fired = engine.acquire_due(at + Duration::hours(1)).await.unwrap();
    assert!(fired.is_empty());
    assert!(engine.trigger_info(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_job() {
    let engine = SqliteEngine::in_memory().await.unwrap();
    let detail = job(ScheduleEventType::Start);
    let key = detail.key.clone();
    engine
        .add_job(detail, TriggerSpec::Daily { hour: 6, minute: 0 })
        .await
        .unwrap();

    assert!(engine.delete_job(&key).await.unwrap());
    assert!(!engine.delete_job(&key).await.unwrap());
    assert!(engine.job_data(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_jobs_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.db");
    let detail = job(ScheduleEventType::Start);
    let key = detail.key.clone();

    {
        let engine = SqliteEngine::open(&path).await.unwrap();
        engine
            .add_job(detail, TriggerSpec::Daily { hour: 9, minute: 0 })
            .await
            .unwrap();
    }

    let engine = SqliteEngine::open(&path).await.unwrap();
    assert_eq!(engine.job_keys().await.unwrap(), vec![key]);
}

#[tokio::test]
async fn test_interrupted_job_is_recovered() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.db");
    let at = Utc::now() + Duration::seconds(5);
    let detail = job(ScheduleEventType::Once);
    let key = detail.key.clone();

    {
        let engine = SqliteEngine::open(&path).await.unwrap();
        engine.add_job(detail, TriggerSpec::Once { at }).await.unwrap();
        let fired = engine.acquire_due(at).await.unwrap();
        assert_eq!(fired.len(), 1);
        // Process "crashes" before complete().
    }

    let engine = SqliteEngine::open(&path).await.unwrap();
    let replay = engine.acquire_due(Utc::now()).await.unwrap();
    assert_eq!(replay.len(), 1);
    assert_eq!(replay[0].job_key, key);
    assert!(replay[0].recovering);

    engine.complete(&key).await.unwrap();
    drop(engine);

    // Completed jobs are not replayed again.
    let engine = SqliteEngine::open(&path).await.unwrap();
    assert!(engine.acquire_due(Utc::now()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_interrupted_job_without_recovery_is_dropped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.db");
    let at = Utc::now() + Duration::seconds(5);
    let mut detail = job(ScheduleEventType::Once);
    detail.request_recovery = false;

    {
        let engine = SqliteEngine::open(&path).await.unwrap();
        engine.add_job(detail, TriggerSpec::Once { at }).await.unwrap();
        engine.acquire_due(at).await.unwrap();
    }

    let engine = SqliteEngine::open(&path).await.unwrap();
    assert!(engine.acquire_due(Utc::now()).await.unwrap().is_empty());
}
