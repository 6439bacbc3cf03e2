//! # Topicron Core
//!
//! Scheduling core: recurrence strategies, the dispatch service, the
//! schedule/resource caches and the topic dispatcher that runs fired jobs.
//!
//! ## Components
//!
//! - [`strategy`] - One [`ScheduleJobStrategy`] per schedule type
//! - [`StrategyRegistry`] / [`HandlerRegistry`] - Lookup tables for strategies and handlers
//! - [`ScheduleEventService`] - Validate, resolve a strategy, register jobs
//! - [`ScheduleCache`] / [`ResourceCache`] - In-memory mirrors of the stores
//! - [`ScheduleManager`] - Inbound schedule and attachment operations
//! - [`TopicDispatcher`] - Fans fired jobs out to interested handlers

pub mod cache;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod manager;
pub mod registry;
pub mod strategy;
pub mod validator;

#[cfg(test)]
mod test_support;

pub use cache::{ResourceCache, ScheduleCache};
pub use dispatch::ScheduleEventService;
pub use error::RegistryError;
pub use executor::TopicDispatcher;
pub use handlers::LoggingTopicHandler;
pub use manager::{ScheduleManager, SyncReport};
pub use registry::{HandlerRegistry, StrategyRegistry};
pub use strategy::{
    CustomStrategy, DailyStrategy, DateWiseStrategy, MonthlyStrategy, PlannedEvent, Recurrence,
    ScheduleJobStrategy, WeeklyStrategy, YearlyStrategy,
};
