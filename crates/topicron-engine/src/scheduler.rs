//! Engine-backed unified scheduler.
//!
//! Keeps a `schedule id -> job keys` index next to the engine so that
//! schedule-wide operations do not scan every job. When the index has no
//! entry for a schedule (fresh process over a durable engine), the keys are
//! recovered by scanning job keys and job data, and the index is refilled.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use topicron_protocols::{
    Day, EngineError, JobData, JobDetail, JobEngine, JobKey, ScheduleEventTrigger,
    ScheduleJobStatus, SchedulingError, Topic, TriggerSpec, TriggerState, UnifiedScheduler,
};

use crate::cron;

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

/// `UnifiedScheduler` over any [`JobEngine`].
pub struct EngineScheduler {
    engine: Arc<dyn JobEngine>,
    index: DashMap<Uuid, HashSet<JobKey>>,
}

impl EngineScheduler {
    pub fn new(engine: Arc<dyn JobEngine>) -> Self {
        Self {
            engine,
            index: DashMap::new(),
        }
    }

    pub fn engine(&self) -> &Arc<dyn JobEngine> {
        &self.engine
    }

    /// Rebuild the schedule index from the engine. Returns the number of jobs indexed.
    pub async fn rebuild_index(&self) -> Result<usize, SchedulingError> {
        self.index.clear();
        let mut indexed = 0;

        for key in self.engine.job_keys().await? {
            if let Some(schedule_id) = self.correlate(&key).await? {
                self.index.entry(schedule_id).or_default().insert(key);
                indexed += 1;
            }
        }

        info!(
            engine = self.engine.name(),
            "Indexed {} job(s) across {} schedule(s)",
            indexed,
            self.index.len()
        );
        Ok(indexed)
    }

    /// Schedule id a job belongs to, from its key or, failing that, its data.
    async fn correlate(&self, key: &JobKey) -> Result<Option<Uuid>, EngineError> {
        if let Some(id) = key.schedule_id() {
            return Ok(Some(id));
        }
        Ok(self
            .engine
            .job_data(key)
            .await?
            .and_then(|data| data.schedule_id()))
    }

    /// Linear scan over all jobs.
    async fn scan(&self, schedule_id: Uuid) -> Result<Vec<JobKey>, EngineError> {
        let mut keys = Vec::new();
        for key in self.engine.job_keys().await? {
            if self.correlate(&key).await? == Some(schedule_id) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn index_insert(&self, schedule_id: Uuid, key: JobKey) {
        self.index.entry(schedule_id).or_default().insert(key);
    }

    fn index_remove(&self, key: &JobKey) {
        match key.schedule_id() {
            Some(id) => {
                if let Some(mut keys) = self.index.get_mut(&id) {
                    keys.remove(key);
                }
                self.index.remove_if(&id, |_, keys| keys.is_empty());
            }
            None => {
                for mut keys in self.index.iter_mut() {
                    keys.remove(key);
                }
                self.index.retain(|_, keys| !keys.is_empty());
            }
        }
    }

    /// Register one job per topic.
    async fn register_per_topic(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        spec: TriggerSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        let mut keys = Vec::with_capacity(topics.len());

        for topic in topics {
            if cancel.is_cancelled() {
                warn!(
                    schedule_id = %trigger.schedule_id,
                    registered = keys.len(),
                    "Scheduling cancelled before topic {}", topic
                );
                return Err(SchedulingError::Cancelled);
            }

            let scoped = trigger.for_topic(topic.clone());
            if let Some(key) = self
                .add(&scoped, std::slice::from_ref(topic), topics.len(), spec.clone())
                .await?
            {
                keys.push(key);
            }
        }

        Ok(keys)
    }

    /// Register a single job carrying every topic.
    async fn register_bulk(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        spec: TriggerSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        if topics.is_empty() {
            return Ok(Vec::new());
        }
        if cancel.is_cancelled() {
            return Err(SchedulingError::Cancelled);
        }
        let key = self.add(trigger, topics, topics.len(), spec).await?;
        Ok(key.into_iter().collect())
    }

    /// Returns `None` when a one-shot trigger is already in the past.
    async fn add(
        &self,
        trigger: &ScheduleEventTrigger,
        topics: &[Topic],
        original_topic_count: usize,
        spec: TriggerSpec,
    ) -> Result<Option<JobKey>, SchedulingError> {
        let key = JobKey::generate(trigger.schedule_id, trigger.event_type);
        let data = JobData::for_event(&key, trigger, topics, original_topic_count)?;

        let mut detail = JobDetail::new(key.clone(), data);
        detail.durable = !matches!(spec, TriggerSpec::Once { .. });
        let durable = detail.durable;

        let info = self.engine.add_job(detail, spec).await?;
        if info.state == TriggerState::Complete && !durable {
            debug!(
                schedule_id = %trigger.schedule_id,
                event = %trigger.event_type,
                "One-shot trigger already passed, nothing registered"
            );
            return Ok(None);
        }
        self.index_insert(trigger.schedule_id, key.clone());

        debug!(
            schedule_id = %trigger.schedule_id,
            event = %trigger.event_type,
            job_key = %key,
            next_fire = ?info.next_fire,
            "Job registered"
        );
        Ok(Some(key))
    }

    async fn states(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<(TriggerState, Option<DateTime<Utc>>)>, SchedulingError> {
        let mut states = Vec::new();
        for key in self.job_keys_for_schedule(schedule_id).await? {
            if let Some(info) = self.engine.trigger_info(&key).await? {
                states.push((info.state, info.next_fire));
            }
        }
        Ok(states)
    }

    async fn apply(&self, schedule_id: Uuid, action: JobAction) -> Result<usize, SchedulingError> {
        let mut applied = 0;

        for key in self.job_keys_for_schedule(schedule_id).await? {
            let outcome = match action {
                JobAction::Pause => self.engine.pause_job(&key).await,
                JobAction::Resume => self.engine.resume_job(&key).await,
            };
            match outcome {
                Ok(()) => applied += 1,
                Err(EngineError::JobNotFound(_)) => {
                    debug!(job_key = %key, "Dropping stale index entry");
                    self.index_remove(&key);
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(%schedule_id, "{} {} job(s)", action.past_tense(), applied);
        Ok(applied)
    }
}

#[derive(Debug, Clone, Copy)]
enum JobAction {
    Pause,
    Resume,
}

impl JobAction {
    fn past_tense(&self) -> &'static str {
        match self {
            Self::Pause => "Paused",
            Self::Resume => "Resumed",
        }
    }
}

fn daily_spec(time: NaiveTime) -> TriggerSpec {
    TriggerSpec::Daily {
        hour: time.hour(),
        minute: time.minute(),
    }
}

fn cron_spec(expression: String) -> TriggerSpec {
    TriggerSpec::Cron { expression }
}

#[async_trait]
impl UnifiedScheduler for EngineScheduler {
    async fn schedule_daily(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        time: NaiveTime,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        self.register_bulk(topics, trigger, daily_spec(time), cancel)
            .await
    }

    async fn schedule_week_days(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        time: NaiveTime,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        let spec = cron_spec(cron::week_days(time)?);
        self.register_per_topic(topics, trigger, spec, cancel).await
    }

    async fn schedule_weekend_days(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        time: NaiveTime,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        let spec = cron_spec(cron::weekend_days(time)?);
        self.register_per_topic(topics, trigger, spec, cancel).await
    }

    async fn schedule_selected_days(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        time: NaiveTime,
        days: &[Day],
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        let spec = cron_spec(cron::selected_days(time, days)?);
        self.register_per_topic(topics, trigger, spec, cancel).await
    }

    async fn schedule_date_wise(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        self.register_per_topic(topics, trigger, TriggerSpec::Once { at }, cancel)
            .await
    }

    async fn schedule_once(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        self.register_per_topic(topics, trigger, TriggerSpec::Once { at }, cancel)
            .await
    }

    async fn schedule_monthly(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        day_of_month: u32,
        time: NaiveTime,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        let spec = cron_spec(cron::monthly(day_of_month, time)?);
        self.register_per_topic(topics, trigger, spec, cancel).await
    }

    async fn schedule_cron(
        &self,
        topics: &[Topic],
        trigger: &ScheduleEventTrigger,
        expression: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        cron::parse(expression)?;
        let spec = cron_spec(expression.to_string());
        self.register_per_topic(topics, trigger, spec, cancel).await
    }

    async fn unschedule(&self, key: &JobKey) -> Result<bool, SchedulingError> {
        let existed = self.engine.delete_job(key).await?;
        self.index_remove(key);
        Ok(existed)
    }

    async fn unschedule_all(&self, keys: &[JobKey]) -> Result<usize, SchedulingError> {
        let mut removed = 0;
        for key in keys {
            if self.unschedule(key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn pause_job(&self, schedule_id: Uuid) -> Result<usize, SchedulingError> {
        self.apply(schedule_id, JobAction::Pause).await
    }

    async fn resume_job(&self, schedule_id: Uuid) -> Result<usize, SchedulingError> {
        self.apply(schedule_id, JobAction::Resume).await
    }

    async fn job_keys_for_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<JobKey>, SchedulingError> {
        if let Some(keys) = self.index.get(&schedule_id) {
            if !keys.is_empty() {
                let mut keys: Vec<JobKey> = keys.iter().cloned().collect();
                keys.sort();
                return Ok(keys);
            }
        }

        let mut keys = self.scan(schedule_id).await?;
        keys.sort();
        for key in &keys {
            self.index_insert(schedule_id, key.clone());
        }
        Ok(keys)
    }

    async fn schedule_status(
        &self,
        schedule_id: Uuid,
    ) -> Result<ScheduleJobStatus, SchedulingError> {
        // Finished triggers are neither enabled nor paused.
        let live: Vec<TriggerState> = self
            .states(schedule_id)
            .await?
            .into_iter()
            .map(|(state, _)| state)
            .filter(|state| *state != TriggerState::Complete)
            .collect();

        if live.is_empty() {
            Ok(ScheduleJobStatus::NotFound)
        } else if live.contains(&TriggerState::Normal) {
            Ok(ScheduleJobStatus::Enabled)
        } else {
            Ok(ScheduleJobStatus::Disabled)
        }
    }

    async fn next_execution_time(
        &self,
        schedule_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, SchedulingError> {
        let states = self.states(schedule_id).await?;
        Ok(states
            .into_iter()
            .filter(|(state, _)| *state == TriggerState::Normal)
            .filter_map(|(_, next)| next)
            .min())
    }
}
