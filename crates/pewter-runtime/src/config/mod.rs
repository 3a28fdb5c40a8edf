//! Configuration module for the Pewter runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for the bot credentials, the polling worker pool and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotSettings, DispatcherConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    PewterConfig, PollingConfig, SpanEventConfig,
};
pub use validation::{validate_config, validate_for_polling};
