//! Built-in middleware.
//!
//! - [`recovery`] turns a panic anywhere later in the chain into a logged,
//!   successful dispatch.
//! - [`cancel_guard`] stops waiting for the chain once the dispatch's
//!   cancellation token fires.
//!
//! Both are ordinary handlers. Add them with [`Router::use_middleware`], or
//! install `cancel_guard` with [`RouterBuilder::cancel_handler`] so it wraps
//! the whole dispatch.
//!
//! [`Router::use_middleware`]: crate::Router::use_middleware
//! [`RouterBuilder::cancel_handler`]: crate::RouterBuilder::cancel_handler

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, error};

use crate::context::Context;
use crate::error::RouterError;
use crate::handler::{BoxedHandler, handler};

/// Catches panics in the rest of the chain.
///
/// The panic is logged at `error` level and the dispatch ends with `Ok(())`.
pub fn recovery() -> BoxedHandler {
    handler(|ctx: Context| async move {
        let update_id = ctx.update().update_id;
        let chain = ctx.clone();
        match AssertUnwindSafe(async move { chain.next().await })
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                error!(
                    update_id,
                    panic = panic_message(&*panic),
                    "Recovered from panic in handler chain"
                );
                Ok(())
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Races the rest of the chain against the dispatch's cancellation token.
///
/// When the token fires first the chain is dropped and the dispatch fails
/// with [`RouterError::Canceled`].
pub fn cancel_guard() -> BoxedHandler {
    handler(|ctx: Context| async move {
        let token = ctx.cancellation();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(update_id = ctx.update().update_id, "Dispatch canceled");
                Err(RouterError::Canceled.into())
            }
            result = ctx.next() => result,
        }
    })
}
