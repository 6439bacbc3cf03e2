//! Persistence collaborator protocols.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::resource::ResourceAttachment;
use crate::schedule::Schedule;

/// Async CRUD over schedules.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Schedule>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Schedule>, StoreError>;

    async fn add(&self, schedule: &Schedule) -> Result<(), StoreError>;

    /// Full replace. Fails with `NotFound` for an unknown id.
    async fn update(&self, schedule: &Schedule) -> Result<(), StoreError>;

    /// Returns false if nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Async CRUD over schedule-resource mappings.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<ResourceAttachment>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<ResourceAttachment>, StoreError>;

    async fn get_by_schedule(&self, schedule_id: Uuid)
        -> Result<Vec<ResourceAttachment>, StoreError>;

    async fn add(&self, attachment: &ResourceAttachment) -> Result<(), StoreError>;

    async fn update(&self, attachment: &ResourceAttachment) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
