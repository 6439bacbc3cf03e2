//! Backend job engine protocol.
//!
//! A job engine stores named jobs with opaque key-value data, each driven by
//! exactly one trigger. The dispatch core only ever refers to jobs by key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;
use crate::resource::Topic;
use crate::trigger::{ScheduleEventTrigger, ScheduleEventType};

const JOB_PREFIX: &str = "schedule-";
const TRIGGER_PREFIX: &str = "trigger-";
const UUID_LEN: usize = 36;

/// Job key of the form `schedule-{scheduleId}-{eventType}-{suffix}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(schedule_id: Uuid, event_type: ScheduleEventType, suffix: &str) -> Self {
        Self(format!("{}{}-{}-{}", JOB_PREFIX, schedule_id, event_type, suffix))
    }

    /// Generate a globally unique key for a schedule event.
    pub fn generate(schedule_id: Uuid, event_type: ScheduleEventType) -> Self {
        Self::new(schedule_id, event_type, &Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing key string without validation.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Schedule id embedded in the key, if the key is well-formed.
    pub fn schedule_id(&self) -> Option<Uuid> {
        self.parts().map(|(id, _)| id)
    }

    /// Event type embedded in the key, if the key is well-formed.
    pub fn event_type(&self) -> Option<ScheduleEventType> {
        self.parts().map(|(_, event)| event)
    }

    pub fn belongs_to(&self, schedule_id: Uuid) -> bool {
        self.schedule_id() == Some(schedule_id)
    }

    /// The trigger key paired with this job.
    pub fn trigger_key(&self) -> TriggerKey {
        let rest = self.0.strip_prefix(JOB_PREFIX).unwrap_or(&self.0);
        TriggerKey(format!("{}{}", TRIGGER_PREFIX, rest))
    }

    fn parts(&self) -> Option<(Uuid, ScheduleEventType)> {
        let rest = self.0.strip_prefix(JOB_PREFIX)?;
        let id = Uuid::parse_str(rest.get(..UUID_LEN)?).ok()?;
        let tail = rest.get(UUID_LEN..)?.strip_prefix('-')?;
        let event = tail.split('-').next()?.parse().ok()?;
        Some((id, event))
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trigger key of the form `trigger-{scheduleId}-{eventType}-{suffix}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerKey(String);

impl TriggerKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque key-value data attached to a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobData(BTreeMap<String, String>);

impl JobData {
    pub const SCHEDULE_ID: &'static str = "scheduleId";
    pub const EVENT_TYPE: &'static str = "eventType";
    pub const TOPICS: &'static str = "topics";
    pub const ORIGINAL_TOPIC_COUNT: &'static str = "originalTopicCount";
    pub const CREATED_AT: &'static str = "createdAt";
    pub const JOB_KEY: &'static str = "jobKey";

    pub fn new() -> Self {
        Self::default()
    }

    /// Build the data map carried by a schedule event job.
    pub fn for_event(
        key: &JobKey,
        trigger: &ScheduleEventTrigger,
        topics: &[Topic],
        original_topic_count: usize,
    ) -> Result<Self, EngineError> {
        let topics_json = serde_json::to_string(topics)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;

        let mut data = Self::new();
        data.insert(Self::SCHEDULE_ID, trigger.schedule_id.to_string());
        data.insert(Self::EVENT_TYPE, trigger.event_type.as_str());
        data.insert(Self::TOPICS, topics_json);
        data.insert(Self::ORIGINAL_TOPIC_COUNT, original_topic_count.to_string());
        data.insert(Self::CREATED_AT, Utc::now().to_rfc3339());
        data.insert(Self::JOB_KEY, key.as_str());
        Ok(data)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn schedule_id(&self) -> Option<Uuid> {
        self.get(Self::SCHEDULE_ID)
            .and_then(|id| Uuid::parse_str(id).ok())
    }

    pub fn event_type(&self) -> Option<ScheduleEventType> {
        self.get(Self::EVENT_TYPE).and_then(|e| e.parse().ok())
    }

    /// Decode the serialized topic list.
    pub fn topics(&self) -> Result<Vec<Topic>, EngineError> {
        let raw = self
            .get(Self::TOPICS)
            .ok_or_else(|| EngineError::Serialization("job data has no topics".to_string()))?;
        serde_json::from_str(raw).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get(Self::CREATED_AT)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A job registration request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub key: JobKey,
    pub data: JobData,
    /// Keep the job after its trigger completes.
    pub durable: bool,
    /// Re-deliver the job if the engine stopped while it was firing.
    pub request_recovery: bool,
}

impl JobDetail {
    pub fn new(key: JobKey, data: JobData) -> Self {
        Self {
            key,
            data,
            durable: true,
            request_recovery: true,
        }
    }
}

/// How a trigger computes its fire times. Times are UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TriggerSpec {
    /// Fire exactly once.
    Once { at: DateTime<Utc> },
    /// Fire every day at `hour:minute`.
    Daily { hour: u32, minute: u32 },
    /// Fire on a 6-field cron expression.
    Cron { expression: String },
}

/// Trigger state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerState {
    Normal,
    Paused,
    Complete,
    Error,
}

impl TriggerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Paused => "paused",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl FromStr for TriggerState {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Self::Normal),
            "paused" => Ok(Self::Paused),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            other => Err(EngineError::Serialization(format!(
                "unknown trigger state: {}",
                other
            ))),
        }
    }
}

/// Snapshot of a job's trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub spec: TriggerSpec,
    pub state: TriggerState,
    pub next_fire: Option<DateTime<Utc>>,
}

/// A job delivered by the engine for execution.
#[derive(Debug, Clone)]
pub struct FiredJob {
    pub job_key: JobKey,
    pub data: JobData,
    pub scheduled_for: DateTime<Utc>,
    /// The engine stopped while this job was firing and is replaying it.
    pub recovering: bool,
}

/// Backend job engine adapter.
#[async_trait]
pub trait JobEngine: Send + Sync {
    /// Returns the engine name.
    fn name(&self) -> &str;

    /// Register a job with its trigger.
    async fn add_job(&self, job: JobDetail, trigger: TriggerSpec)
        -> Result<TriggerInfo, EngineError>;

    /// Delete a job. Returns false if it did not exist.
    async fn delete_job(&self, key: &JobKey) -> Result<bool, EngineError>;

    /// Pause a job's trigger.
    async fn pause_job(&self, key: &JobKey) -> Result<(), EngineError>;

    /// Resume a job's trigger.
    async fn resume_job(&self, key: &JobKey) -> Result<(), EngineError>;

    /// Enumerate all job keys.
    async fn job_keys(&self) -> Result<Vec<JobKey>, EngineError>;

    /// Get a job's data.
    async fn job_data(&self, key: &JobKey) -> Result<Option<JobData>, EngineError>;

    /// Get a job's trigger snapshot.
    async fn trigger_info(&self, key: &JobKey) -> Result<Option<TriggerInfo>, EngineError>;

    /// Take every job due at `now`, advancing its trigger.
    async fn acquire_due(&self, now: DateTime<Utc>) -> Result<Vec<FiredJob>, EngineError>;

    /// Mark a fired job as finished.
    async fn complete(&self, key: &JobKey) -> Result<(), EngineError>;
}

/// Runs jobs delivered by an engine.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: FiredJob);
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
