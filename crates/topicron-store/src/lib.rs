//! # Topicron Store
//!
//! Persistence collaborators for schedules and resource attachments.
//!
//! - [`MemoryScheduleRepository`] / [`MemoryResourceRepository`] - volatile stores
//! - [`SqliteStore`] - both repositories over one SQLite database

mod memory;
mod schema;
mod sqlite;

pub use memory::{MemoryResourceRepository, MemoryScheduleRepository};
pub use sqlite::SqliteStore;
