//! # Pewter
//!
//! A typed long-polling and routing framework for Telegram-style bot APIs.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     ┌──────────────┐     ┌────────────┐     ┌──────────────────────┐
//! │ UpdateFetcher │────▶│ UpdateStream │────▶│ Dispatcher │────▶│ Router               │
//! │ (getUpdates)  │     │ (PollCursor) │     │ (N workers)│     │  middleware → routes │
//! └───────────────┘     └──────────────┘     └────────────┘     └──────────────────────┘
//! ```
//!
//! - **Core**: update model, error taxonomy, `Bot` API handle, polling loop
//! - **Framework**: routes, filters, router views, pooled handler context
//! - **Runtime**: dispatcher worker pool, configuration, logging
//! - **Transport**: reqwest bot client, axum webhook endpoint
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pewter::prelude::*;
//!
//! async fn start(ctx: Context) -> HandlerResult {
//!     ctx.reply("Hello!").await?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let bot = connect_bot(&config.bot).await?;
//!     let router = Router::builder().bot(bot.clone()).build();
//!     router.use_middleware([middleware::recovery()]);
//!     router.on_start(handlers![start]);
//!
//!     Dispatcher::from_config(bot, router, &config).run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default) / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output
//! - `http-client` (default): reqwest bot client and `connect_bot`
//! - `webhook`: axum webhook endpoint
//! - `full-transport`: both transports

pub use pewter_core as core;
pub use pewter_framework as framework;
pub use pewter_runtime as runtime;
pub use pewter_transport as transport;

pub use pewter_framework::handlers;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use pewter::prelude::*;
/// ```
pub mod prelude {
    // Runtime - dispatcher, configuration and logging
    pub use pewter_runtime::config::{ConfigLoader, PewterConfig, load_config};
    pub use pewter_runtime::{Dispatcher, DispatcherError, logging};
    #[cfg(feature = "http-client")]
    pub use pewter_runtime::{build_bot, connect_bot};

    // Routing - registering handlers
    pub use pewter_framework::{
        BoxedHandler, Context, HandlerResult, Route, RouteHandle, Router, RouterBuilder,
        RouterError, filters, handler, handlers, middleware,
    };

    // Core types - updates and the bot API
    pub use pewter_core::{
        ApiError, Bot, BoxError, CancellationToken, Message, ParseMode, PollingOptions, Update,
        UpdateKind, User,
    };

    // Transports
    #[cfg(feature = "http-client")]
    pub use pewter_transport::{HttpBotClient, HttpClientConfig};
    #[cfg(feature = "webhook")]
    pub use pewter_transport::{WebhookState, webhook_router};
}
