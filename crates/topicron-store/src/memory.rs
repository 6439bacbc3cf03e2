//! In-memory repositories.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use topicron_protocols::{
    ResourceAttachment, ResourceRepository, Schedule, ScheduleRepository, StoreError,
};

/// In-memory schedule store.
pub struct MemoryScheduleRepository {
    schedules: RwLock<HashMap<Uuid, Schedule>>,
}

impl MemoryScheduleRepository {
    pub fn new() -> Self {
        Self {
            schedules: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryScheduleRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleRepository for MemoryScheduleRepository {
    async fn get_all(&self) -> Result<Vec<Schedule>, StoreError> {
        let schedules = self.schedules.read().await;
        Ok(schedules.values().cloned().collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Schedule>, StoreError> {
        let schedules = self.schedules.read().await;
        Ok(schedules.get(&id).cloned())
    }

    async fn add(&self, schedule: &Schedule) -> Result<(), StoreError> {
        let mut schedules = self.schedules.write().await;
        if schedules.contains_key(&schedule.id) {
            return Err(StoreError::AlreadyExists(schedule.id.to_string()));
        }
        schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn update(&self, schedule: &Schedule) -> Result<(), StoreError> {
        let mut schedules = self.schedules.write().await;
        match schedules.get_mut(&schedule.id) {
            Some(existing) => {
                *existing = schedule.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(schedule.id.to_string())),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut schedules = self.schedules.write().await;
        Ok(schedules.remove(&id).is_some())
    }
}

/// In-memory resource attachment store.
pub struct MemoryResourceRepository {
    attachments: RwLock<HashMap<Uuid, ResourceAttachment>>,
}

impl MemoryResourceRepository {
    pub fn new() -> Self {
        Self {
            attachments: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryResourceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceRepository for MemoryResourceRepository {
    async fn get_all(&self) -> Result<Vec<ResourceAttachment>, StoreError> {
        let attachments = self.attachments.read().await;
        Ok(attachments.values().cloned().collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ResourceAttachment>, StoreError> {
        let attachments = self.attachments.read().await;
        Ok(attachments.get(&id).cloned())
    }

    async fn get_by_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<ResourceAttachment>, StoreError> {
        let attachments = self.attachments.read().await;
        Ok(attachments
            .values()
            .filter(|a| a.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    async fn add(&self, attachment: &ResourceAttachment) -> Result<(), StoreError> {
        let mut attachments = self.attachments.write().await;
        if attachments.contains_key(&attachment.id) {
            return Err(StoreError::AlreadyExists(attachment.id.to_string()));
        }
        attachments.insert(attachment.id, attachment.clone());
        Ok(())
    }

    async fn update(&self, attachment: &ResourceAttachment) -> Result<(), StoreError> {
        let mut attachments = self.attachments.write().await;
        match attachments.get_mut(&attachment.id) {
            Some(existing) => {
                *existing = attachment.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(attachment.id.to_string())),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut attachments = self.attachments.write().await;
        Ok(attachments.remove(&id).is_some())
    }
}
