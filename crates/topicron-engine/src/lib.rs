//! # Topicron Engine
//!
//! Backend job engines and the engine-backed [`UnifiedScheduler`].
//!
//! ## Components
//!
//! - [`cron`] - Cron expression builders for the engine's dialect
//! - [`MemoryEngine`] - Volatile job engine
//! - [`SqliteEngine`] - Durable job engine with crash-recovery replay
//! - [`EngineScheduler`] - `UnifiedScheduler` over any [`JobEngine`]
//! - [`EngineRunner`] - Polls an engine and hands due jobs to an executor
//!
//! [`UnifiedScheduler`]: topicron_protocols::UnifiedScheduler
//! [`JobEngine`]: topicron_protocols::JobEngine

pub mod cron;
pub mod memory;
pub mod runner;
pub mod scheduler;
pub mod sqlite;
pub mod trigger;

mod schema;

pub use memory::MemoryEngine;
pub use runner::EngineRunner;
pub use scheduler::EngineScheduler;
pub use sqlite::SqliteEngine;
