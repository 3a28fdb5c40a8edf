//! Handler system for the Pewter framework.
//!
//! A handler is any async function taking an owned [`Context`] and returning a
//! [`HandlerResult`]. Middleware is just a handler that calls
//! [`Context::next`] to continue the chain; a handler that does not call it
//! ends the chain there.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn log_updates(ctx: Context) -> HandlerResult {
//!     tracing::info!(update_id = ctx.update().update_id, "incoming");
//!     ctx.next().await
//! }
//!
//! router.use_middleware(handlers![log_updates]);
//! router.on_command("ping", handlers![|ctx: Context| async move {
//!     ctx.reply("pong").await?;
//!     Ok(())
//! }]);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use pewter_core::BoxError;

use crate::context::Context;
use crate::error::HandlerResult;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Handler Trait
// ============================================================================

/// A unit of work in a middleware or route chain.
///
/// Implemented for every `Fn(Context) -> impl Future<Output = HandlerResult>`.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(ctx))
    }
}

/// A type-erased handler that can be stored in a chain.
pub type BoxedHandler = Arc<dyn Handler>;

/// Boxes an async function into a [`BoxedHandler`].
pub fn handler<F, Fut>(f: F) -> BoxedHandler
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}

/// Boxes a hand-written [`Handler`] implementation.
pub fn boxed<H: Handler>(h: H) -> BoxedHandler {
    Arc::new(h)
}

/// Builds a handler chain from async functions and closures.
///
/// ```rust,ignore
/// router.on(filters::message(), handlers![auth, |ctx: Context| async move { Ok(()) }]);
/// ```
#[macro_export]
macro_rules! handlers {
    () => {
        ::std::vec::Vec::<$crate::BoxedHandler>::new()
    };
    ($($h:expr),+ $(,)?) => {
        ::std::vec![$($crate::handler::handler($h)),+]
    };
}

// ============================================================================
// Error Handler
// ============================================================================

/// Receives errors that escaped a dispatch.
///
/// When a router has an error handler, `handle_update` reports success after
/// calling it, whatever the chain returned.
pub trait ErrorHandler: Send + Sync + 'static {
    fn call(&self, ctx: Context, err: BoxError) -> BoxFuture<'static, ()>;
}

impl<F, Fut> ErrorHandler for F
where
    F: Fn(Context, BoxError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, ctx: Context, err: BoxError) -> BoxFuture<'static, ()> {
        Box::pin(self(ctx, err))
    }
}

pub type BoxedErrorHandler = Arc<dyn ErrorHandler>;

/// Boxes an async function into a [`BoxedErrorHandler`].
pub fn error_handler<F, Fut>(f: F) -> BoxedErrorHandler
where
    F: Fn(Context, BoxError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pewter_core::Update;

    async fn named(_ctx: Context) -> HandlerResult {
        Err("named handler".into())
    }

    #[tokio::test]
    async fn functions_and_closures_become_handlers() {
        let chain = handlers![named, |_ctx: Context| async move { Ok(()) }];
        assert_eq!(chain.len(), 2);

        let ctx = Context::detached(Update::default());
        let err = chain[0].call(ctx.clone()).await.unwrap_err();
        assert_eq!(err.to_string(), "named handler");
        assert!(chain[1].call(ctx).await.is_ok());
    }

    #[test]
    fn empty_chain() {
        let chain: Vec<BoxedHandler> = handlers![];
        assert!(chain.is_empty());
    }
}
