//! Shared fixtures for core tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use topicron_engine::{EngineScheduler, MemoryEngine};
use topicron_protocols::{
    EngineError, FiredJob, JobData, JobDetail, JobEngine, JobKey, ScheduleEventType, Topic,
    TriggerInfo, TriggerSpec,
};

pub fn topics(names: &[&str]) -> Vec<Topic> {
    names.iter().map(|n| Topic::from(*n)).collect()
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 6, 12, hour, minute, 0).unwrap()
}

pub fn memory_scheduler() -> (Arc<MemoryEngine>, Arc<EngineScheduler>) {
    let engine = Arc::new(MemoryEngine::new());
    let scheduler = Arc::new(EngineScheduler::new(engine.clone()));
    (engine, scheduler)
}

/// Memory engine that can be told to reject End event registrations.
#[derive(Default)]
pub struct FlakyEngine {
    pub inner: MemoryEngine,
    reject_end: AtomicBool,
}

impl FlakyEngine {
    pub fn reject_end(&self, reject: bool) {
        self.reject_end.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobEngine for FlakyEngine {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn add_job(&self, job: JobDetail, spec: TriggerSpec) -> Result<TriggerInfo, EngineError> {
        if self.reject_end.load(Ordering::SeqCst)
            && job.key.event_type() == Some(ScheduleEventType::End)
        {
            return Err(EngineError::Storage("end jobs rejected".to_string()));
        }
        self.inner.add_job(job, spec).await
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
