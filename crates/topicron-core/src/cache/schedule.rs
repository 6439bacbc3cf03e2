use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use topicron_protocols::{
    Schedule, ScheduleDetail, ScheduleRepository, ScheduleStatus, StoreError,
};

use super::ResourceCache;

/// Schedules keyed by id, joined with the resource cache for detail views.
pub struct ScheduleCache {
    repository: Arc<dyn ScheduleRepository>,
    resources: Arc<ResourceCache>,
    schedules: DashMap<Uuid, Schedule>,
    loaded: OnceCell<()>,
}

impl ScheduleCache {
    pub fn new(repository: Arc<dyn ScheduleRepository>, resources: Arc<ResourceCache>) -> Self {
        Self {
            repository,
            resources,
            schedules: DashMap::new(),
            loaded: OnceCell::new(),
        }
    }

    pub fn resources(&self) -> &Arc<ResourceCache> {
        &self.resources
    }

    /// Load schedules and mappings once. Concurrent callers wait for the
    /// first load; later calls are no-ops.
    pub async fn initialize(&self) -> Result<usize, StoreError> {
        self.resources.initialize().await?;

        if self.loaded.initialized() {
            debug!("Schedule cache already initialized");
            return Ok(self.schedules.len());
        }

        self.loaded
            .get_or_try_init(|| async {
                for schedule in self.repository.get_all().await? {
                    self.schedules.insert(schedule.id, schedule);
                }
                info!(schedules = self.schedules.len(), "Schedule cache initialized");
                Ok::<_, StoreError>(())
            })
            .await?;
        Ok(self.schedules.len())
    }

    /// Drop everything (mappings included) and reload from the stores.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        let all = self.repository.get_all().await?;
        self.resources.refresh().await?;

        self.schedules.clear();
        for schedule in all {
            self.schedules.insert(schedule.id, schedule);
        }
        let _ = self.loaded.set(());
        info!(schedules = self.schedules.len(), "Schedule cache refreshed");
        Ok(self.schedules.len())
    }

    pub fn is_initialized(&self) -> bool {
        self.loaded.initialized()
    }

    pub fn get(&self, id: Uuid) -> Option<Schedule> {
        self.schedules.get(&id).map(|s| s.clone())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.schedules.contains_key(&id)
    }

    /// All schedules, ordered by start time.
    pub fn get_all(&self) -> Vec<Schedule> {
        let mut all: Vec<Schedule> = self.schedules.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| {
            a.start_date_time
                .cmp(&b.start_date_time)
                .then(a.id.cmp(&b.id))
        });
        all
    }

    pub async fn add(&self, schedule: Schedule) -> Result<(), StoreError> {
        self.repository.add(&schedule).await?;
        debug!(schedule_id = %schedule.id, name = %schedule.name, "Schedule added");
        self.schedules.insert(schedule.id, schedule);
        Ok(())
    }

    pub async fn update(&self, schedule: Schedule) -> Result<(), StoreError> {
        self.repository.update(&schedule).await?;
        self.schedules.insert(schedule.id, schedule);
        Ok(())
    }

    /// Persist a new status. Returns the updated schedule, or `None` if unknown.
    pub async fn set_status(
        &self,
        id: Uuid,
        status: ScheduleStatus,
    ) -> Result<Option<Schedule>, StoreError> {
        let Some(mut schedule) = self.get(id) else {
            return Ok(None);
        };
        schedule.status = status;
        self.update(schedule.clone()).await?;
        Ok(Some(schedule))
    }

    /// Remove a schedule and cascade its mappings.
    pub async fn remove(&self, id: Uuid) -> Result<bool, StoreError> {
        let existed = self.repository.delete(id).await?;
        let cascaded = self.resources.remove_for_schedule(id).await?;
        self.schedules.remove(&id);
        debug!(schedule_id = %id, existed, cascaded, "Schedule removed");
        Ok(existed)
    }

    /// A schedule joined with its current mappings.
    pub fn detail(&self, id: Uuid) -> Option<ScheduleDetail> {
        self.get(id).map(|schedule| ScheduleDetail {
            attached_resources: self.resources.by_schedule(id),
            schedule,
        })
    }

    pub fn details(&self) -> Vec<ScheduleDetail> {
        self.get_all()
            .into_iter()
            .map(|schedule| ScheduleDetail {
                attached_resources: self.resources.by_schedule(schedule.id),
                schedule,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}
