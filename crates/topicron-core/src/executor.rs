//! Fan-out of fired jobs to topic handlers.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use topicron_protocols::{
    EngineError, FiredJob, JobExecutor, ScheduleEventTrigger, Topic,
};

use crate::registry::HandlerRegistry;

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

/// Decodes a fired job and invokes every interested handler once per topic.
///
/// Handler failures are logged and never affect other handlers or the engine.
pub struct TopicDispatcher {
    handlers: Arc<HandlerRegistry>,
}

impl TopicDispatcher {
    pub fn new(handlers: Arc<HandlerRegistry>) -> Self {
        Self { handlers }
    }

    /// Rebuild the event trigger and topic list carried by a job.
    pub fn decode(job: &FiredJob) -> Result<(ScheduleEventTrigger, Vec<Topic>), EngineError> {
        let schedule_id = job
            .data
            .schedule_id()
            .or_else(|| job.job_key.schedule_id())
            .ok_or_else(|| EngineError::Serialization("job data has no schedule id".to_string()))?;

        let event_type = job
            .data
            .event_type()
            .or_else(|| job.job_key.event_type())
            .ok_or_else(|| EngineError::Serialization("job data has no event type".to_string()))?;

        let topics = job.data.topics()?;
        let trigger = ScheduleEventTrigger::new(schedule_id, event_type).at(job.scheduled_for);
        Ok((trigger, topics))
    }
}

#[async_trait]
impl JobExecutor for TopicDispatcher {
    async fn execute(&self, job: FiredJob) {
        if job.recovering {
            warn!(
                job_key = %job.job_key,
                scheduled_for = %job.scheduled_for,
                "Recovering missed job execution"
            );
        } else {
            info!(
                job_key = %job.job_key,
                scheduled_for = %job.scheduled_for,
                "Job execution"
            );
        }

        let (trigger, topics) = match Self::decode(&job) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(job_key = %job.job_key, error = %e, "Cannot decode job data");
                return;
            }
        };

        let handlers = self.handlers.interested_in(&topics);
        if handlers.is_empty() {
            warn!(
                schedule_id = %trigger.schedule_id,
                topics = ?topics,
                "No handlers for topics"
            );
            return;
        }

        debug!(
            schedule_id = %trigger.schedule_id,
            topics = topics.len(),
            handlers = handlers.len(),
            "Dispatching event"
        );

        for topic in &topics {
            let scoped = trigger.for_topic(topic.clone());
            let calls = handlers
                .iter()
                .filter(|h| h.is_interested_in(topic))
                .map(|h| {
                    let scoped = &scoped;
                    async move { (h.id(), h.handle(scoped, topic).await) }
                });

            for (handler, outcome) in join_all(calls).await {
                match outcome {
                    Ok(()) => debug!(handler, %topic, "Handler processed topic"),
                    Err(e) => error!(handler, %topic, error = %e, "Handler failed"),
                }
            }
        }
    }
}
