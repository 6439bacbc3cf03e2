//! # Topicron Protocols
//!
//! Core protocol definitions for topicron.
//! Contains the data model and the traits that the scheduling core, the
//! backend job engines and the persistence collaborators agree on.
//!
//! ## Core Traits
//!
//! - [`UnifiedScheduler`] - Backend-agnostic scheduling primitives
//! - [`JobEngine`] - Backend job engine adapter
//! - [`TopicHandler`] - Receives fired schedule events for a set of topics
//! - [`ScheduleRepository`] / [`ResourceRepository`] - Persistence collaborators

pub mod engine;
pub mod error;
pub mod handler;
pub mod repository;
pub mod resource;
pub mod result;
pub mod schedule;
pub mod scheduler;
pub mod trigger;

pub use engine::{
    FiredJob, JobData, JobDetail, JobEngine, JobExecutor, JobKey, TriggerInfo, TriggerKey,
    TriggerSpec, TriggerState,
};
pub use error::{EngineError, HandlerError, SchedulingError, StoreError};
pub use handler::TopicHandler;
pub use repository::{ResourceRepository, ScheduleRepository};
pub use resource::{ResourceAttachment, ResourceType, Topic};
pub use result::{ScheduleJobStatus, ScheduleOperation, ScheduleResult, ScheduleStatusInfo};
pub use schedule::{Day, Schedule, ScheduleDetail, ScheduleStatus, ScheduleSubType, ScheduleType};
pub use scheduler::{UnifiedScheduler, UpdatePolicy};
pub use trigger::{ScheduleEventTrigger, ScheduleEventType};

// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;
