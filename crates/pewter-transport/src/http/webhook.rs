//! Webhook ingestion endpoint.
//!
//! [`webhook_router`] builds an axum router with a single `POST` route that
//! decodes the body as an [`Update`] and hands it to an [`UpdateHandler`].
//! Binding a listener and serving the router is up to the caller.
//!
//! | Outcome | Status |
//! |---------|--------|
//! | secret token missing or wrong | `401` |
//! | body is not an update | `400` |
//! | handler returned an error | `500` |
//! | handled | `200` |
//!
//! # Example
//!
//! ```rust,ignore
//! let state = WebhookState::new(router).with_secret_token("s3cret");
//! let app = webhook_router("/telegram", state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8443").await?;
//! axum::serve(listener, app).await?;
//! ```

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use pewter_core::{Update, UpdateHandler};
use tokio_util::sync::CancellationToken;
use tracing::{error, trace, warn};

/// Header carrying the secret token configured with `setWebhook`.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared state of the webhook route.
#[derive(Clone)]
pub struct WebhookState {
    handler: Arc<dyn UpdateHandler>,
    secret_token: Option<Arc<str>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for WebhookState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookState")
            .field("secret_token", &self.secret_token.is_some())
            .field("canceled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl WebhookState {
    pub fn new<H>(handler: H) -> Self
    where
        H: UpdateHandler + 'static,
    {
        Self {
            handler: Arc::new(handler),
            secret_token: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Requires every request to carry this secret token.
    pub fn with_secret_token(mut self, token: impl Into<String>) -> Self {
        self.secret_token = Some(Arc::from(token.into()));
        self
    }

    /// Parent token of every dispatch started by the endpoint.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        match &self.secret_token {
            None => true,
            Some(expected) => headers
                .get(SECRET_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|given| secrets_match(given.as_bytes(), expected.as_bytes())),
        }
    }
}

/// Compares two secrets without returning early on the first differing byte.
fn secrets_match(given: &[u8], expected: &[u8]) -> bool {
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Builds the webhook router for `path`.
pub fn webhook_router(path: &str, state: WebhookState) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    Router::new()
        .route(&path, post(receive_update))
        .with_state(state)
}

async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !state.authorized(&headers) {
        warn!("Rejected webhook request with invalid secret token");
        return StatusCode::UNAUTHORIZED;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, len = body.len(), "Failed to decode webhook update");
            return StatusCode::BAD_REQUEST;
        }
    };

    let update_id = update.update_id;
    trace!(update_id, "Received webhook update");

    match state
        .handler
        .handle_update(update, state.cancel.child_token())
        .await
    {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!(update_id, error = %e, "Webhook update handler failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
