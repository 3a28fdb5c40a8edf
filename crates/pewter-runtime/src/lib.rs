//! Pewter Runtime - operational layer for the Pewter bot framework.
//!
//! This crate provides:
//! - The polling [`Dispatcher`]: a worker pool between the update source and a router
//! - Configuration loading and validation (`figment`)
//! - Logging setup (`tracing-subscriber`, `tracing-appender`)
//! - Bot construction from configuration (with the `http-client` feature)
//!
//! # Quick Start
//!
//! ```ignore
//! use pewter_runtime::{Dispatcher, config::load_config, connect_bot, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let bot = connect_bot(&config.bot).await?;
//!     let router = Router::builder().bot(bot.clone()).build();
//!     router.on_command("start", handlers![start]);
//!
//!     // Polls until Ctrl+C, then waits for in-flight updates.
//!     Dispatcher::from_config(bot, router, &config).run().await?;
//!     Ok(())
//! }
//! ```

#[cfg(feature = "http-client")]
pub mod bot;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;

// Re-exports
#[cfg(feature = "http-client")]
pub use bot::{build_bot, connect_bot};
pub use config::{ConfigError, ConfigLoader, ConfigResult, PewterConfig};
pub use dispatcher::{DEFAULT_POOL_SIZE, DEFAULT_SHUTDOWN_TIMEOUT, Dispatcher};
pub use error::{DispatcherError, DispatcherResult, RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};

// Re-export tracing for use by applications
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for convenient imports.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
