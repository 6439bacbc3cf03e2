//! Topic handler protocol.

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::resource::Topic;
use crate::trigger::ScheduleEventTrigger;

/// Receives schedule events for the topics it is interested in.
#[async_trait]
pub trait TopicHandler: Send + Sync {
    /// Returns the handler ID.
    fn id(&self) -> &str;

    /// Topics this handler wants events for.
    fn interested_topics(&self) -> &[Topic];

    /// Handle one event for one topic.
    async fn handle(&self, trigger: &ScheduleEventTrigger, topic: &Topic)
        -> Result<(), HandlerError>;

    fn is_interested_in(&self, topic: &Topic) -> bool {
        self.interested_topics().contains(topic)
    }
}
