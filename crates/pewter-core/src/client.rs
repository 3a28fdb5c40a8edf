//! Transport collaborator interfaces.
//!
//! The dispatch engine never talks to the network directly. It depends on
//! three narrow traits instead:
//!
//! - [`BotClient`]: performs one remote API call and decodes the envelope.
//! - [`UpdateFetcher`]: fetches a batch of updates for the polling loop.
//! - [`UpdateHandler`]: consumes one update; implemented by the router and
//!   used by the dispatcher and webhook endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Recorder;
//!
//! #[async_trait]
//! impl UpdateHandler for Recorder {
//!     async fn handle_update(&self, update: Update, _cancel: CancellationToken) -> Result<(), BoxError> {
//!         println!("got {}", update.update_id);
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::bot::GetUpdatesOptions;
use crate::error::{ApiResult, BoxError};
use crate::model::Update;

// =============================================================================
// Request Options
// =============================================================================

/// Per-call overrides for a [`BotClient`] request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Request timeout; `None` uses the client default.
    pub timeout: Option<Duration>,
    /// Alternative API server base URL.
    pub api_url: Option<String>,
    /// Parameters merged over the method parameters before sending.
    pub override_params: Map<String, Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the API server base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Adds a parameter that overrides whatever the method supplies.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.override_params.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Performs calls against the remote bot API.
#[async_trait]
pub trait BotClient: Send + Sync {
    /// Calls `method` with JSON parameters and returns the decoded `result`.
    async fn request(
        &self,
        token: &str,
        method: &str,
        params: Map<String, Value>,
        opts: Option<&RequestOptions>,
    ) -> ApiResult<Value>;

    /// The API base URL this client talks to.
    fn api_url(&self, opts: Option<&RequestOptions>) -> String;

    /// Download URL for a file path returned by the remote API.
    fn file_url(&self, token: &str, path: &str, opts: Option<&RequestOptions>) -> String {
        format!("{}/file/bot{}/{}", self.api_url(opts), token, path)
    }
}

/// Boxed bot client.
pub type BoxedBotClient = Arc<dyn BotClient>;

/// Fetches batches of updates for the polling loop.
///
/// Implementations must report cancellation as [`ApiError::Canceled`] so
/// the loop can tell shutdown apart from a transient failure.
///
/// [`ApiError::Canceled`]: crate::error::ApiError::Canceled
#[async_trait]
pub trait UpdateFetcher: Send + Sync {
    async fn fetch_updates(
        &self,
        params: &GetUpdatesOptions,
        request_timeout: Option<Duration>,
    ) -> ApiResult<Vec<Update>>;
}

#[async_trait]
impl<T: UpdateFetcher + ?Sized> UpdateFetcher for Arc<T> {
    async fn fetch_updates(
        &self,
        params: &GetUpdatesOptions,
        request_timeout: Option<Duration>,
    ) -> ApiResult<Vec<Update>> {
        (**self).fetch_updates(params, request_timeout).await
    }
}

/// Consumes one update at a time.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    /// Handles an update. `cancel` fires when the caller gives up on it.
    async fn handle_update(&self, update: Update, cancel: CancellationToken)
    -> Result<(), BoxError>;
}

#[async_trait]
impl<T: UpdateHandler + ?Sized> UpdateHandler for Arc<T> {
    async fn handle_update(
        &self,
        update: Update,
        cancel: CancellationToken,
    ) -> Result<(), BoxError> {
        (**self).handle_update(update, cancel).await
    }
}
