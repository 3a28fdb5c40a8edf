//! HTTP transports.
//!
//! This module provides the bot API client and the webhook endpoint.

#[cfg(feature = "http-client")]
mod client;
#[cfg(feature = "http-client")]
pub use client::{DEFAULT_API_URL, DEFAULT_TIMEOUT, HttpBotClient, HttpClientConfig};

#[cfg(feature = "webhook")]
mod webhook;
#[cfg(feature = "webhook")]
pub use webhook::{SECRET_TOKEN_HEADER, WebhookState, webhook_router};
