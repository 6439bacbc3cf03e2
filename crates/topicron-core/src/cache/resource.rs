use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use topicron_protocols::{
    ResourceAttachment, ResourceRepository, ResourceType, StoreError, Topic,
};

/// Resource mappings keyed by the mapping's own id.
pub struct ResourceCache {
    repository: Arc<dyn ResourceRepository>,
    mappings: DashMap<Uuid, ResourceAttachment>,
    loaded: OnceCell<()>,
}

impl ResourceCache {
    pub fn new(repository: Arc<dyn ResourceRepository>) -> Self {
        Self {
            repository,
            mappings: DashMap::new(),
            loaded: OnceCell::new(),
        }
    }

    /// Load every mapping once. Concurrent callers wait for the first load;
    /// later calls are no-ops.
    pub async fn initialize(&self) -> Result<usize, StoreError> {
        if self.loaded.initialized() {
            debug!("Resource cache already initialized");
            return Ok(self.mappings.len());
        }

        self.loaded
            .get_or_try_init(|| async {
                let count = self.load().await?;
                info!(mappings = count, "Resource cache initialized");
                Ok::<_, StoreError>(())
            })
            .await?;
        Ok(self.mappings.len())
    }

    /// Drop everything and reload from the store.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        let all = self.repository.get_all().await?;
        self.mappings.clear();
        let count = self.fill(all);
        // Fails only when already set.
        let _ = self.loaded.set(());
        info!(mappings = count, "Resource cache refreshed");
        Ok(count)
    }

    pub fn is_initialized(&self) -> bool {
        self.loaded.initialized()
    }

    pub fn get(&self, id: Uuid) -> Option<ResourceAttachment> {
        self.mappings.get(&id).map(|m| m.clone())
    }

    pub fn get_all(&self) -> Vec<ResourceAttachment> {
        self.mappings.iter().map(|m| m.value().clone()).collect()
    }

    /// Mappings owned by a schedule, ordered by resource id.
    pub fn by_schedule(&self, schedule_id: Uuid) -> Vec<ResourceAttachment> {
        let mut found: Vec<_> = self
            .mappings
            .iter()
            .filter(|m| m.schedule_id == schedule_id)
            .map(|m| m.value().clone())
            .collect();
        found.sort_by(|a, b| a.resource_id.cmp(&b.resource_id).then(a.id.cmp(&b.id)));
        found
    }

    /// Every mapping that points at the given resource.
    pub fn mappings_by_resource(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
    ) -> Vec<ResourceAttachment> {
        self.mappings
            .iter()
            .filter(|m| m.resource_id == resource_id && m.resource_type == resource_type)
            .map(|m| m.value().clone())
            .collect()
    }

    /// Distinct topics attached to a schedule, sorted.
    pub fn topics_for(&self, schedule_id: Uuid) -> Vec<Topic> {
        self.mappings
            .iter()
            .filter(|m| m.schedule_id == schedule_id)
            .filter_map(|m| m.as_topic())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub async fn add(&self, attachment: ResourceAttachment) -> Result<(), StoreError> {
        self.repository.add(&attachment).await?;
        debug!(
            mapping_id = %attachment.id,
            schedule_id = %attachment.schedule_id,
            resource = %attachment.resource_id,
            "Mapping added"
        );
        self.mappings.insert(attachment.id, attachment);
        Ok(())
    }

    pub async fn update(&self, attachment: ResourceAttachment) -> Result<(), StoreError> {
        self.repository.update(&attachment).await?;
        self.mappings.insert(attachment.id, attachment);
        Ok(())
    }

    /// Remove one mapping. Returns false if the store did not have it.
    pub async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let existed = self.repository.delete(id).await?;
        self.mappings.remove(&id);
        Ok(existed)
    }

    /// Remove every mapping owned by a schedule.
    pub async fn remove_for_schedule(&self, schedule_id: Uuid) -> Result<usize, StoreError> {
        let owned: Vec<Uuid> = self
            .repository
            .get_by_schedule(schedule_id)
            .await?
            .into_iter()
            .map(|m| m.id)
            .chain(self.by_schedule(schedule_id).into_iter().map(|m| m.id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut removed = 0;
        for id in owned {
            if self.remove(id).await? {
                removed += 1;
            }
        }
        debug!(%schedule_id, removed, "Cascaded mapping removal");
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    async fn load(&self) -> Result<usize, StoreError> {
        let all = self.repository.get_all().await?;
        Ok(self.fill(all))
    }

    fn fill(&self, all: Vec<ResourceAttachment>) -> usize {
        for mapping in all {
            self.mappings.insert(mapping.id, mapping);
        }
        self.mappings.len()
    }
}
