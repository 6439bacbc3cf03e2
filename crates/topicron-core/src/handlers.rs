//! Built-in topic handlers.

use async_trait::async_trait;
use tracing::info;

use topicron_protocols::{HandlerError, ScheduleEventTrigger, Topic, TopicHandler};

/// Logs every event it receives.
pub struct LoggingTopicHandler {
    id: String,
    topics: Vec<Topic>,
}

impl LoggingTopicHandler {
    pub fn new(id: impl Into<String>, topics: Vec<Topic>) -> Self {
        Self {
            id: id.into(),
            topics,
        }
    }
}

#[async_trait]
impl TopicHandler for LoggingTopicHandler {
    fn id(&self) -> &str {
        &self.id
    }

    fn interested_topics(&self) -> &[Topic] {
        &self.topics
    }

    async fn handle(
        &self,
        trigger: &ScheduleEventTrigger,
        topic: &Topic,
    ) -> Result<(), HandlerError> {
        info!(
            handler = %self.id,
            schedule_id = %trigger.schedule_id,
            event = %trigger.event_type,
            %topic,
            triggered_at = %trigger.triggered_at_utc.to_rfc3339(),
            "Schedule event"
        );
        Ok(())
    }
}
