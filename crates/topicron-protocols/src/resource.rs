//! Resource attachments.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A downstream topic that schedule events are broadcast to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Kind of downstream system an attachment refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    #[default]
    Topic,
    #[serde(other)]
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for ResourceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "topic" => Self::Topic,
            _ => Self::Other,
        })
    }
}

/// A schedule-to-resource mapping. Identity is the mapping's own `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAttachment {
    pub id: Uuid,

    pub schedule_id: Uuid,

    pub resource_id: String,

    #[serde(default)]
    pub resource_type: ResourceType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ResourceAttachment {
    /// Create a topic attachment for a schedule.
    pub fn topic(schedule_id: Uuid, topic: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            schedule_id,
            resource_id: topic.into(),
            resource_type: ResourceType::Topic,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// The topic this attachment broadcasts to, if it is a topic attachment.
    pub fn as_topic(&self) -> Option<Topic> {
        match self.resource_type {
            ResourceType::Topic => Some(Topic::new(self.resource_id.clone())),
            ResourceType::Other => None,
        }
    }
}
