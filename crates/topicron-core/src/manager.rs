//! Inbound schedule operations.
//!
//! [`ScheduleManager`] keeps the caches, the stores and the engine in step:
//! writes go to the store and cache first, then the engine jobs are
//! (re)registered from the cached attachments.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use topicron_protocols::{
    ResourceAttachment, Schedule, ScheduleDetail, ScheduleJobStatus, ScheduleOperation,
    ScheduleResult, ScheduleStatus, ScheduleStatusInfo, SchedulingError, Topic,
};

use crate::cache::{ResourceCache, ScheduleCache};
use crate::dispatch::ScheduleEventService;
use crate::validator::{check_attachment, check_topics, validate_schedule};

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

/// Outcome of reconciling stored schedules with the engine at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub schedules: usize,
    pub registered: usize,
    pub resumed: usize,
    pub paused: usize,
    pub failed: usize,
}

pub struct ScheduleManager {
    schedules: Arc<ScheduleCache>,
    events: ScheduleEventService,
}

impl ScheduleManager {
    pub fn new(schedules: Arc<ScheduleCache>, events: ScheduleEventService) -> Self {
        Self { schedules, events }
    }

    pub fn schedules(&self) -> &Arc<ScheduleCache> {
        &self.schedules
    }

    pub fn resources(&self) -> &Arc<ResourceCache> {
        self.schedules.resources()
    }

    pub fn events(&self) -> &ScheduleEventService {
        &self.events
    }

    /// Load the caches and bring the engine in line with them.
    ///
    /// Schedules without live jobs are registered (paused if disabled);
    /// schedules whose paused or running jobs disagree with their status are
    /// resumed or paused.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<SyncReport, SchedulingError> {
        let mut report = SyncReport {
            schedules: self.schedules.initialize().await?,
            ..Default::default()
        };

        for schedule in self.schedules.get_all() {
            if cancel.is_cancelled() {
                return Err(SchedulingError::Cancelled);
            }

            let status = self.events.scheduler().schedule_status(schedule.id).await?;
            let result = match (status, schedule.is_enabled()) {
                (ScheduleJobStatus::NotFound, _) => {
                    let topics = self.resources().topics_for(schedule.id);
                    let result = self.events.create(&schedule, &topics, cancel).await?;
                    // A schedule whose instants have all passed registers nothing.
                    if result.success && !result.job_ids.is_empty() {
                        report.registered += 1;
                    }
                    result
                }
                (ScheduleJobStatus::Disabled, true) => {
                    let result = self.events.enable(&schedule).await?;
                    report.resumed += usize::from(result.success);
                    result
                }
                (ScheduleJobStatus::Enabled, false) => {
                    let result = self.events.disable(&schedule).await?;
                    report.paused += usize::from(result.success);
                    result
                }
                _ => continue,
            };

            if !result.success {
                report.failed += 1;
                warn!(
                    schedule_id = %schedule.id,
                    message = result.message.as_deref().unwrap_or_default(),
                    "Startup sync failed for schedule"
                );
            }
        }

        info!(
            schedules = report.schedules,
            registered = report.registered,
            resumed = report.resumed,
            paused = report.paused,
            failed = report.failed,
            "Schedules synchronized with engine"
        );
        Ok(report)
    }

    /// Persist a schedule with its topics and register its jobs.
    pub async fn create(
        &self,
        schedule: Schedule,
        topics: &[Topic],
        cancel: &CancellationToken,
    ) -> Result<ScheduleResult, SchedulingError> {
        check_topics(topics)?;
        if let Err(e) = validate_schedule(&schedule) {
            return Ok(ScheduleResult::from_error(e).with_operation(ScheduleOperation::Create));
        }

        self.schedules.add(schedule.clone()).await?;
        for topic in topics {
            self.resources()
                .add(ResourceAttachment::topic(schedule.id, topic.as_str()))
                .await?;
        }

        let topics = self.resources().topics_for(schedule.id);
        self.events.create(&schedule, &topics, cancel).await
    }

    /// Replace a schedule's definition and re-register its jobs.
    pub async fn update(
        &self,
        schedule: Schedule,
        cancel: &CancellationToken,
    ) -> Result<ScheduleResult, SchedulingError> {
        let op = ScheduleOperation::Update;
        if !self.schedules.contains(schedule.id) {
            return Ok(Self::not_found(schedule.id, op));
        }
        if let Err(e) = validate_schedule(&schedule) {
            return Ok(ScheduleResult::from_error(e).with_operation(op));
        }

        self.schedules.update(schedule.clone()).await?;
        let topics = self.resources().topics_for(schedule.id);
        self.events.update(&schedule, &topics, cancel).await
    }

    /// Remove a schedule's jobs, then the schedule and its mappings.
    ///
    /// When the jobs cannot be removed the stored schedule is kept.
    pub async fn delete(&self, schedule_id: Uuid) -> Result<ScheduleResult, SchedulingError> {
        let op = ScheduleOperation::Delete;
        let Some(schedule) = self.schedules.get(schedule_id) else {
            return Ok(Self::not_found(schedule_id, op));
        };

        let result = self.events.delete(&schedule).await?;
        if result.success {
            self.schedules.remove(schedule_id).await?;
        }
        Ok(result)
    }

    pub async fn enable(&self, schedule_id: Uuid) -> Result<ScheduleResult, SchedulingError> {
        self.set_status(schedule_id, ScheduleStatus::Enabled).await
    }

    pub async fn disable(&self, schedule_id: Uuid) -> Result<ScheduleResult, SchedulingError> {
        self.set_status(schedule_id, ScheduleStatus::Disabled).await
    }

    /// Attach a topic to a schedule and re-register its jobs.
    pub async fn attach(
        &self,
        schedule_id: Uuid,
        topic: Topic,
        cancel: &CancellationToken,
    ) -> Result<ScheduleResult, SchedulingError> {
        self.attach_resource(ResourceAttachment::topic(schedule_id, topic.as_str()), cancel)
            .await
    }

    /// Attach an arbitrary mapping and re-register the owner's jobs.
    pub async fn attach_resource(
        &self,
        attachment: ResourceAttachment,
        cancel: &CancellationToken,
    ) -> Result<ScheduleResult, SchedulingError> {
        check_attachment(&attachment)?;
        let Some(schedule) = self.schedules.get(attachment.schedule_id) else {
            return Ok(Self::not_found(attachment.schedule_id, ScheduleOperation::Update));
        };

        self.resources().add(attachment).await?;
        self.reschedule(&schedule, cancel).await
    }

    /// Remove a mapping and re-register its owner's jobs.
    pub async fn detach(
        &self,
        mapping_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<ScheduleResult, SchedulingError> {
        let op = ScheduleOperation::Update;
        let Some(mapping) = self.resources().get(mapping_id) else {
            return Ok(ScheduleResult::from_error(SchedulingError::NotFound(format!(
                "mapping {}",
                mapping_id
            )))
            .with_operation(op));
        };

        self.resources().remove(mapping_id).await?;
        match self.schedules.get(mapping.schedule_id) {
            Some(schedule) => self.reschedule(&schedule, cancel).await,
            None => Ok(ScheduleResult::success(Vec::new()).with_operation(op)),
        }
    }

    pub fn attachments(&self, schedule_id: Uuid) -> Vec<ResourceAttachment> {
        self.resources().by_schedule(schedule_id)
    }

    pub fn schedule(&self, schedule_id: Uuid) -> Option<Schedule> {
        self.schedules.get(schedule_id)
    }

    pub fn list(&self) -> Vec<Schedule> {
        self.schedules.get_all()
    }

    pub fn detail(&self, schedule_id: Uuid) -> Option<ScheduleDetail> {
        self.schedules.detail(schedule_id)
    }

    pub fn details(&self) -> Vec<ScheduleDetail> {
        self.schedules.details()
    }

    pub async fn status(&self, schedule_id: Uuid) -> Result<ScheduleStatusInfo, SchedulingError> {
        self.events.schedule_status(schedule_id).await
    }

    /// Reload both caches from the stores. Engine jobs are left alone.
    pub async fn refresh(&self) -> Result<usize, SchedulingError> {
        Ok(self.schedules.refresh().await?)
    }

    async fn set_status(
        &self,
        schedule_id: Uuid,
        status: ScheduleStatus,
    ) -> Result<ScheduleResult, SchedulingError> {
        let op = match status {
            ScheduleStatus::Enabled => ScheduleOperation::Enable,
            ScheduleStatus::Disabled => ScheduleOperation::Disable,
        };

        let Some(schedule) = self.schedules.set_status(schedule_id, status).await? else {
            return Ok(Self::not_found(schedule_id, op));
        };

        match status {
            ScheduleStatus::Enabled => self.events.enable(&schedule).await,
            ScheduleStatus::Disabled => self.events.disable(&schedule).await,
        }
    }

    async fn reschedule(
        &self,
        schedule: &Schedule,
        cancel: &CancellationToken,
    ) -> Result<ScheduleResult, SchedulingError> {
        let topics = self.resources().topics_for(schedule.id);
        self.events.update(schedule, &topics, cancel).await
    }

    fn not_found(schedule_id: Uuid, op: ScheduleOperation) -> ScheduleResult {
        ScheduleResult::from_error(SchedulingError::NotFound(format!("schedule {}", schedule_id)))
            .with_operation(op)
    }
}
