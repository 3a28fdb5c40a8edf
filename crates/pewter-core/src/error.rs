//! Unified error types for the Pewter core.
//!
//! Router and runtime errors live in their own crates; this module only holds
//! what the transport collaborator and the polling loop can produce.

use thiserror::Error;

/// Boxed error type used by handler chains.
///
/// Handler errors travel through [`Context::next`] untouched, so a caller can
/// `downcast_ref` a returned error back to its own sentinel type.
///
/// [`Context::next`]: https://docs.rs/pewter-framework
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// API Errors
// =============================================================================

/// Errors produced by a call into the remote bot API.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The remote API answered with `ok: false`.
    #[error("unable to {method}: {description}")]
    Remote {
        /// The API method that failed.
        method: String,
        /// Error code reported by the remote side.
        code: i64,
        /// Human readable description.
        description: String,
        /// Seconds to wait before retrying, for flood-control errors.
        retry_after: Option<i64>,
        /// The group was migrated to a supergroup with this identifier.
        migrate_to_chat_id: Option<i64>,
    },

    /// The HTTP exchange itself failed.
    #[error("failed to execute request to {method}: {reason}")]
    Http {
        /// The API method being called.
        method: String,
        /// Reason for failure (never contains the bot token).
        reason: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request did not complete within its timeout.
    #[error("request timed out")]
    Timeout,

    /// The surrounding operation was canceled.
    #[error("operation canceled")]
    Canceled,

    /// An outbound helper was used on a context that carries no bot.
    #[error("no bot is attached to this context")]
    NoBot,

    /// An outbound helper needs data the current update does not carry.
    #[error("update has no {0}")]
    MissingField(&'static str),
}

impl ApiError {
    /// Returns `true` if this error signals cancellation rather than failure.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns the remote error code, if the remote API produced this error.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_message_names_method() {
        let err = ApiError::Remote {
            method: "sendMessage".into(),
            code: 400,
            description: "Bad Request: chat not found".into(),
            retry_after: None,
            migrate_to_chat_id: None,
        };
        assert_eq!(
            err.to_string(),
            "unable to sendMessage: Bad Request: chat not found"
        );
        assert_eq!(err.code(), Some(400));
        assert!(!err.is_canceled());
    }

    #[test]
    fn canceled_is_recognised() {
        assert!(ApiError::Canceled.is_canceled());
        assert_eq!(ApiError::Timeout.code(), None);
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let err: ApiError = serde_json::from_str::<i64>("nope").unwrap_err().into();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
