//! In-memory mirrors of the schedule and resource stores.
//!
//! Writes persist first and only then touch the maps, so a failed store
//! call leaves the cache as it was.

mod resource;
mod schedule;

pub use resource::ResourceCache;
pub use schedule::ScheduleCache;

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
