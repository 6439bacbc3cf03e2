//! Topic handler errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),

    #[error("Handler unavailable: {0}")]
    Unavailable(String),
}
