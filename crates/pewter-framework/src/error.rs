//! Error types for the Pewter framework.

use pewter_core::BoxError;
use thiserror::Error;

/// Dispatch-level failures produced by the router itself.
///
/// Handler errors are never wrapped in this type; they reach the caller of
/// [`Router::handle_update`](crate::Router::handle_update) exactly as the
/// handler returned them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// No registered route accepted the update.
    #[error("route not found")]
    RouteNotFound,

    /// `handle_update` was called on a state-scoped or grouped view.
    #[error("group cannot handle updates")]
    GroupCannotHandleUpdates,

    /// The dispatch's cancellation token fired before the chain finished.
    #[error("dispatch canceled")]
    Canceled,
}

impl RouterError {
    /// Returns the router error behind a handler error, if it is one.
    pub fn from_boxed(err: &BoxError) -> Option<&RouterError> {
        err.downcast_ref::<RouterError>()
    }
}

/// Result of a handler or middleware.
pub type HandlerResult = Result<(), BoxError>;
