//! Tower integration.
//!
//! [`RouterService`] exposes a root [`Router`] as a
//! `tower::Service<Dispatch>`, so standard tower layers (timeouts,
//! concurrency limits, request mapping) can wrap the whole dispatch.
//! [`ServiceHandler`] turns any such service back into an
//! [`UpdateHandler`] for the dispatcher or the webhook endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .timeout(Duration::from_secs(30))
//!     .service(RouterService::new(router));
//!
//! let dispatcher = Dispatcher::new(bot, ServiceHandler::new(service));
//! ```

use std::task::{Context, Poll};

use async_trait::async_trait;
use pewter_core::{BoxError, Update, UpdateHandler};
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};

use crate::handler::BoxFuture;
use crate::router::Router;

/// One update together with the token that cancels its dispatch.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub update: Update,
    pub cancel: CancellationToken,
}

impl From<Update> for Dispatch {
    fn from(update: Update) -> Self {
        Self {
            update,
            cancel: CancellationToken::new(),
        }
    }
}

// ============================================================================
// Router as a Service
// ============================================================================

/// A root router as a tower service.
#[derive(Debug, Clone)]
pub struct RouterService {
    router: Router,
}

impl RouterService {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

impl Service<Dispatch> for RouterService {
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Dispatch) -> Self::Future {
        let router = self.router.clone();
        Box::pin(async move { router.handle_update(req.update, req.cancel).await })
    }
}

// ============================================================================
// Service as an UpdateHandler
// ============================================================================

/// Adapts a tower service into an [`UpdateHandler`].
///
/// Every update is sent to a clone of the service, so the service must be
/// cheap to clone (tower services usually are).
#[derive(Debug, Clone)]
pub struct ServiceHandler<S> {
    service: S,
}

impl<S> ServiceHandler<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> UpdateHandler for ServiceHandler<S>
where
    S: Service<Dispatch, Response = ()> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
{
    async fn handle_update(&self, update: Update, cancel: CancellationToken) -> Result<(), BoxError> {
        self.service
            .clone()
            .oneshot(Dispatch { update, cancel })
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context as EventContext;
    use crate::handlers;
    use std::time::Duration;
    use tower::ServiceBuilder;

    #[tokio::test]
    async fn router_service_dispatches() {
        let router = Router::new();
        router.on_message(handlers![|_ctx: EventContext| async move { Ok(()) }]);

        let mut service = RouterService::new(router);
        let update = Update::from_message(1, pewter_core::Message::text(1, "hi"));
        assert!(service.ready().await.is_ok());
        assert!(service.call(update.into()).await.is_ok());
        assert!(service.call(Update::default().into()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn layered_service_works_as_update_handler() {
        let router = Router::new();
        router.on_update(handlers![|_ctx: EventContext| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }]);

        let service = ServiceBuilder::new()
            .timeout(Duration::from_secs(5))
            .service(RouterService::new(router));
        let handler = ServiceHandler::new(service);

        let err = handler
            .handle_update(Update::default(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is::<tower::timeout::error::Elapsed>());
    }
}
