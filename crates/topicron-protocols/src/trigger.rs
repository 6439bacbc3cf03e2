//! Schedule event triggers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::resource::Topic;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScheduleEventType {
    Start,
    End,
    Once,
}

impl ScheduleEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::End => "End",
            Self::Once => "Once",
        }
    }
}

impl fmt::Display for ScheduleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Start" => Ok(Self::Start),
            "End" => Ok(Self::End),
            "Once" => Ok(Self::Once),
            other => Err(format!("unknown event type: {}", other)),
        }
    }
}

/// Payload correlated to a fired job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEventTrigger {
    pub schedule_id: Uuid,
    pub event_type: ScheduleEventType,
    pub triggered_at_utc: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<Topic>,
}

impl ScheduleEventTrigger {
    pub fn new(schedule_id: Uuid, event_type: ScheduleEventType) -> Self {
        Self {
            schedule_id,
            event_type,
            triggered_at_utc: Utc::now(),
            topic: None,
        }
    }

    pub fn at(mut self, triggered_at_utc: DateTime<Utc>) -> Self {
        self.triggered_at_utc = triggered_at_utc;
        self
    }

    pub fn for_topic(&self, topic: Topic) -> Self {
        Self {
            topic: Some(topic),
            ..self.clone()
        }
    }
}
