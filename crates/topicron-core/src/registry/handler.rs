//! Topic handler registry.

use std::sync::Arc;

use topicron_protocols::{Topic, TopicHandler};

use super::base::{BaseRegistry, Registerable};
use crate::error::RegistryError;

impl Registerable for dyn TopicHandler {
    fn registry_id(&self) -> &str {
        self.id()
    }
}

/// Registry of handlers that receive fired schedule events.
pub struct HandlerRegistry {
    inner: BaseRegistry<dyn TopicHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            inner: BaseRegistry::new(),
        }
    }

    pub fn register(&self, handler: Arc<dyn TopicHandler>) -> Result<(), RegistryError> {
        self.inner.register(handler)
    }

    pub fn unregister(&self, id: &str) -> Result<Arc<dyn TopicHandler>, RegistryError> {
        self.inner.unregister(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn TopicHandler>> {
        self.inner.get(id)
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.inner.list_ids()
    }

    /// Handlers interested in at least one of `topics`, ordered by ID.
    pub fn interested_in(&self, topics: &[Topic]) -> Vec<Arc<dyn TopicHandler>> {
        let mut handlers: Vec<_> = self
            .inner
            .iter()
            .filter(|h| topics.iter().any(|t| h.is_interested_in(t)))
            .collect();
        handlers.sort_by(|a, b| a.id().cmp(b.id()));
        handlers
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
