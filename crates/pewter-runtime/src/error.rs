//! Runtime error types.

use std::time::Duration;

use pewter_core::ApiError;
use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};

/// Errors from the dispatcher lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatcherError {
    #[error("dispatcher already started")]
    AlreadyStarted,

    #[error("dispatcher not started")]
    NotStarted,

    /// Workers were still busy when the shutdown deadline passed. They keep
    /// winding down in the background.
    #[error("dispatcher did not stop within {0:?}")]
    DeadlineExceeded(Duration),
}

/// Result type for dispatcher operations.
pub type DispatcherResult<T> = Result<T, DispatcherError>;

/// Errors that can occur while setting up or running a bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Dispatcher(#[from] DispatcherError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The bot API rejected or failed a startup call.
    #[error("Bot API error: {0}")]
    Api(#[from] ApiError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
