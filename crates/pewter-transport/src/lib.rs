//! # Pewter Transport
//!
//! Network transports for the Pewter bot framework.
//!
//! The dispatch engine only knows the collaborator traits in `pewter-core`;
//! this crate provides the concrete implementations behind feature flags.
//!
//! ## Features
//!
//! - `http-client` (default): [`HttpBotClient`], a reqwest [`BotClient`]
//! - `webhook`: an axum endpoint that feeds webhook updates to an [`UpdateHandler`]
//! - `full`: both
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  pewter-framework   │  (Router implements UpdateHandler)
//! ├─────────────────────┤
//! │  pewter-core        │  (BotClient / UpdateFetcher / UpdateHandler)
//! ├─────────────────────┤
//! │  pewter-transport   │  <- This crate (implementations)
//! ├─────────────────────┤
//! │  Network (HTTP)     │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pewter_core::Bot;
//! use pewter_transport::{HttpBotClient, HttpClientConfig};
//!
//! let client = HttpBotClient::new(HttpClientConfig::default())?;
//! let bot = Bot::new(token, Arc::new(client)).verify().await?;
//! ```
//!
//! [`BotClient`]: pewter_core::BotClient
//! [`UpdateHandler`]: pewter_core::UpdateHandler

#[cfg(any(feature = "http-client", feature = "webhook"))]
pub mod http;

#[cfg(feature = "http-client")]
pub use http::{DEFAULT_API_URL, DEFAULT_TIMEOUT, HttpBotClient, HttpClientConfig};

#[cfg(feature = "webhook")]
pub use http::{SECRET_TOKEN_HEADER, WebhookState, webhook_router};
