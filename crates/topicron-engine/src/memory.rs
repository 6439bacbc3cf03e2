//! In-memory job engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use topicron_protocols::{
    EngineError, FiredJob, JobData, JobDetail, JobEngine, JobKey, TriggerInfo, TriggerSpec,
    TriggerState,
};

use crate::trigger;

struct JobEntry {
    detail: JobDetail,
    trigger: TriggerInfo,
    in_flight: bool,
}

/// Volatile job engine. Jobs are lost when the process exits.
pub struct MemoryEngine {
    jobs: DashMap<JobKey, JobEntry>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobEngine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    async fn add_job(
        &self,
        job: JobDetail,
        spec: TriggerSpec,
    ) -> Result<TriggerInfo, EngineError> {
        trigger::validate(&spec)?;
        let next_fire = trigger::first_fire(&spec, Utc::now())?;

        let info = TriggerInfo {
            key: job.key.trigger_key(),
            job_key: job.key.clone(),
            spec,
            state: if next_fire.is_some() {
                TriggerState::Normal
            } else {
                TriggerState::Complete
            },
            next_fire,
        };

        match self.jobs.entry(job.key.clone()) {
            Entry::Occupied(_) => Err(EngineError::JobExists(job.key.to_string())),
            Entry::Vacant(_) if info.state == TriggerState::Complete && !job.durable => {
                debug!(job_key = %job.key, "Job never fires, not stored");
                Ok(info)
            }
            Entry::Vacant(slot) => {
                debug!(job_key = %job.key, next_fire = ?info.next_fire, "Job added");
                slot.insert(JobEntry {
                    detail: job,
                    trigger: info.clone(),
                    in_flight: false,
                });
                Ok(info)
            }
        }
    }

    async fn delete_job(&self, key: &JobKey) -> Result<bool, EngineError> {
        Ok(self.jobs.remove(key).is_some())
    }

    async fn pause_job(&self, key: &JobKey) -> Result<(), EngineError> {
        let mut entry = self
            .jobs
            .get_mut(key)
            .ok_or_else(|| EngineError::JobNotFound(key.to_string()))?;
        if entry.trigger.state == TriggerState::Normal {
            entry.trigger.state = TriggerState::Paused;
        }
        Ok(())
    }

    async fn resume_job(&self, key: &JobKey) -> Result<(), EngineError> {
        let mut entry = self
            .jobs
            .get_mut(key)
            .ok_or_else(|| EngineError::JobNotFound(key.to_string()))?;
        if entry.trigger.state == TriggerState::Paused {
            trigger::resume(&mut entry.trigger, Utc::now())?;
        }
        Ok(())
    }

    async fn job_keys(&self) -> Result<Vec<JobKey>, EngineError> {
        Ok(self.jobs.iter().map(|e| e.key().clone()).collect())
    }

    async fn job_data(&self, key: &JobKey) -> Result<Option<JobData>, EngineError> {
        Ok(self.jobs.get(key).map(|e| e.detail.data.clone()))
    }

    async fn trigger_info(&self, key: &JobKey) -> Result<Option<TriggerInfo>, EngineError> {
        Ok(self.jobs.get(key).map(|e| e.trigger.clone()))
    }

    async fn acquire_due(&self, now: DateTime<Utc>) -> Result<Vec<FiredJob>, EngineError> {
        let mut fired = Vec::new();
        let mut finished = Vec::new();

        for mut entry in self.jobs.iter_mut() {
            let scheduled_for = match (entry.trigger.state, entry.trigger.next_fire) {
                (TriggerState::Normal, Some(next)) if next <= now => next,
                _ => continue,
            };

            let advance = match trigger::advance(&entry.trigger.spec, scheduled_for, now) {
                Ok(advance) => advance,
                Err(e) => {
                    warn!(job_key = %entry.key(), "Trigger error: {}", e);
                    entry.trigger.state = TriggerState::Error;
                    continue;
                }
            };

            entry.trigger.state = advance.state();
            entry.trigger.next_fire = advance.next_fire;

            if advance.fire {
                entry.in_flight = true;
                fired.push(FiredJob {
                    job_key: entry.key().clone(),
                    data: entry.detail.data.clone(),
                    scheduled_for,
                    recovering: false,
                });
            } else {
                debug!(job_key = %entry.key(), %scheduled_for, "Misfire skipped");
                if advance.next_fire.is_none() && !entry.detail.durable {
                    finished.push(entry.key().clone());
                }
            }
        }

        for key in finished {
            self.jobs.remove(&key);
        }

        Ok(fired)
    }

    async fn complete(&self, key: &JobKey) -> Result<(), EngineError> {
        let drop_job = match self.jobs.get_mut(key) {
            Some(mut entry) => {
                entry.in_flight = false;
                entry.trigger.state == TriggerState::Complete && !entry.detail.durable
            }
            None => false,
        };

        if drop_job {
            self.jobs.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
