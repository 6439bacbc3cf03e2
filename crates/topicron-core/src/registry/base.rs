//! Base registry trait and implementation.

use dashmap::DashMap;
use std::sync::Arc;

use crate::error::RegistryError;

/// Items that can be stored in a registry under a unique ID.
pub trait Registerable: Send + Sync {
    fn registry_id(&self) -> &str;
}

/// Concurrent map of registered items by ID.
///
/// `T` is usually a trait object such as `dyn TopicHandler`.
pub struct BaseRegistry<T: ?Sized + Registerable> {
    items: DashMap<String, Arc<T>>,
}

impl<T: ?Sized + Registerable> BaseRegistry<T> {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }

    /// Register an item. Fails if the ID is taken.
    pub fn register(&self, item: Arc<T>) -> Result<(), RegistryError> {
        use dashmap::mapref::entry::Entry;

        match self.items.entry(item.registry_id().to_string()) {
            Entry::Occupied(entry) => Err(RegistryError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(item);
                Ok(())
            }
        }
    }

    pub fn unregister(&self, id: &str) -> Result<Arc<T>, RegistryError> {
        self.items
            .remove(id)
            .map(|(_, item)| item)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.items.get(id).map(|item| item.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Registered IDs, sorted.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.items.iter().map(|item| item.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Arc<T>> + '_ {
        self.items.iter().map(|entry| entry.value().clone())
    }
}

impl<T: ?Sized + Registerable> Default for BaseRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
