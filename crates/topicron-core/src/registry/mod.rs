//! Registries for strategies and topic handlers.

mod base;
mod handler;
mod strategy;

pub use base::{BaseRegistry, Registerable};
pub use handler::HandlerRegistry;
pub use strategy::StrategyRegistry;
