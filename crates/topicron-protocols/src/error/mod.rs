//! Error types for the topicron protocol layer.

mod engine;
mod handler;
mod scheduling;
mod store;

pub use engine::*;
pub use handler::*;
pub use scheduling::*;
pub use store::*;
