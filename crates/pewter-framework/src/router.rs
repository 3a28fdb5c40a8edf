//! The router: route registration and update dispatch.
//!
//! A [`Router`] is a node in a tree of views. The root owns the only route
//! table; state-scoped views ([`Router::use_state`]) and groups
//! ([`Router::group`]) append to that same table, so routes are tried in
//! registration order across the whole tree no matter which view added them.
//!
//! # Middleware
//!
//! - Middleware added to the **root** runs once per dispatch, before route
//!   matching.
//! - Middleware added to a **child view** is copied in front of the handler
//!   chain of every route registered directly through that view afterwards.
//!   A nested view starts with only its own middleware; it does not inherit
//!   its parent's.
//!
//! # Registration Phase
//!
//! Register every route and middleware before dispatching starts. Registration
//! takes short locks so it is memory safe at any time, but a route added while
//! updates are in flight may or may not be seen by them.
//!
//! # Example
//!
//! ```rust,ignore
//! let router = Router::builder().bot(bot).build();
//!
//! router.use_middleware(handlers![load_state]);
//! router.on_start(handlers![greet]).name("start");
//!
//! let admin = router.use_state("admin", handlers![require_admin]);
//! admin.on_message(handlers![admin_panel]);
//!
//! router.handle_update(update, CancellationToken::new()).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use pewter_core::{Bot, BoxError, Update, UpdateHandler};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, trace};

use crate::context::{ContextPool, DEFAULT_MAX_IDLE};
use crate::error::{HandlerResult, RouterError};
use crate::filter::{self, Filter};
use crate::handler::{BoxedErrorHandler, BoxedHandler, ErrorHandler, error_handler};
use crate::route::{Route, RouteHandle};

// =============================================================================
// Router Tree
// =============================================================================

/// State shared by every view of one router tree.
struct RouterShared {
    routes: RwLock<Vec<Arc<Route>>>,
    pool: Arc<ContextPool>,
    bot: Option<Bot>,
    error_handler: Option<BoxedErrorHandler>,
    cancel_handler: Option<BoxedHandler>,
}

struct RouterNode {
    parent: Option<Router>,
    state: Option<String>,
    middleware: RwLock<Vec<BoxedHandler>>,
    shared: Arc<RouterShared>,
}

/// A root router or a view into one.
///
/// Cloning is cheap and yields another handle to the same view.
#[derive(Clone)]
pub struct Router {
    node: Arc<RouterNode>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("root", &self.is_root())
            .field("state", &self.node.state)
            .field("middleware", &self.node.middleware.read().len())
            .field("routes", &self.route_count())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for a root [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    bot: Option<Bot>,
    error_handler: Option<BoxedErrorHandler>,
    cancel_handler: Option<BoxedHandler>,
    max_idle_contexts: Option<usize>,
}

impl RouterBuilder {
    /// Sets the default bot of every dispatch.
    pub fn bot(mut self, bot: Bot) -> Self {
        self.bot = Some(bot);
        self
    }

    /// Sets the handler that receives every error a dispatch ends with.
    ///
    /// With an error handler set, `handle_update` always succeeds.
    pub fn error_handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(crate::Context, BoxError) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.error_handler = Some(error_handler(f));
        self
    }

    pub fn error_handler_boxed(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Sets a handler that runs in place of the first `next` of each
    /// dispatch, typically [`cancel_guard`](crate::middleware::cancel_guard).
    pub fn cancel_handler(mut self, handler: BoxedHandler) -> Self {
        self.cancel_handler = Some(handler);
        self
    }

    /// Caps the number of idle contexts kept for reuse.
    pub fn max_idle_contexts(mut self, max: usize) -> Self {
        self.max_idle_contexts = Some(max);
        self
    }

    pub fn build(self) -> Router {
        let shared = RouterShared {
            routes: RwLock::new(Vec::new()),
            pool: Arc::new(ContextPool::with_max_idle(
                self.max_idle_contexts.unwrap_or(DEFAULT_MAX_IDLE),
            )),
            bot: self.bot,
            error_handler: self.error_handler,
            cancel_handler: self.cancel_handler,
        };
        Router {
            node: Arc::new(RouterNode {
                parent: None,
                state: None,
                middleware: RwLock::new(Vec::new()),
                shared: Arc::new(shared),
            }),
        }
    }
}

// =============================================================================
// Registration
// =============================================================================

macro_rules! filter_sugar {
    ($($(#[$doc:meta])* $method:ident => $filter:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $method(&self, handlers: impl IntoIterator<Item = BoxedHandler>) -> RouteHandle {
                self.on(filter::$filter(), handlers)
            }
        )*
    };
}

impl Router {
    /// Creates a root router without a default bot or error handler.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Returns `true` for the root of the tree, the only view that can
    /// dispatch.
    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    /// The state tag routes registered through this view require.
    pub fn state(&self) -> Option<&str> {
        self.node.state.as_deref()
    }

    /// The default bot of this router tree.
    pub fn bot(&self) -> Option<&Bot> {
        self.node.shared.bot.as_ref()
    }

    /// Adds middleware to this view.
    pub fn use_middleware(&self, handlers: impl IntoIterator<Item = BoxedHandler>) -> &Self {
        self.node.middleware.write().extend(handlers);
        self
    }

    /// Creates a view whose routes only match contexts in `state`.
    pub fn use_state(
        &self,
        state: impl Into<String>,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Router {
        self.child(Some(state.into()), handlers)
    }

    /// Creates a view that shares `handlers` as a prefix of every route
    /// registered through it. The view keeps this view's state requirement.
    pub fn group(&self, handlers: impl IntoIterator<Item = BoxedHandler>) -> Router {
        self.child(self.node.state.clone(), handlers)
    }

    fn child(
        &self,
        state: Option<String>,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> Router {
        Router {
            node: Arc::new(RouterNode {
                parent: Some(self.clone()),
                state,
                middleware: RwLock::new(handlers.into_iter().collect()),
                shared: Arc::clone(&self.node.shared),
            }),
        }
    }

    /// Registers a route and appends it to the root's route table.
    ///
    /// On a child view the route's chain is this view's own middleware
    /// followed by `handlers`. Root middleware is not folded in; it runs once
    /// per dispatch instead.
    pub fn on(
        &self,
        filter: Filter,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> RouteHandle {
        let mut chain = if self.is_root() {
            Vec::new()
        } else {
            self.node.middleware.read().clone()
        };
        chain.extend(handlers);

        let route = Arc::new(Route::new(filter, self.node.state.clone(), chain));
        let mut routes = self.node.shared.routes.write();
        routes.push(Arc::clone(&route));
        debug!(
            route_index = routes.len() - 1,
            state = self.node.state.as_deref(),
            handler_count = route.handler_count(),
            "Route registered"
        );
        RouteHandle::new(route)
    }

    /// Registers a route for `/command` messages.
    pub fn on_command(
        &self,
        command: impl Into<String>,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> RouteHandle {
        self.on(filter::command(command), handlers)
    }

    /// Registers a route for `/command@bot_username` messages.
    pub fn on_command_with_at(
        &self,
        command: impl Into<String>,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> RouteHandle {
        self.on(filter::command_with_at(command), handlers)
    }

    pub fn on_start(&self, handlers: impl IntoIterator<Item = BoxedHandler>) -> RouteHandle {
        self.on(filter::command("start"), handlers)
    }

    pub fn on_text_prefix(
        &self,
        prefix: impl Into<String>,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> RouteHandle {
        self.on(filter::text_prefix(prefix), handlers)
    }

    pub fn on_text_contains(
        &self,
        text: impl Into<String>,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> RouteHandle {
        self.on(filter::text_contains(text), handlers)
    }

    pub fn on_callback_prefix(
        &self,
        prefix: impl Into<String>,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> RouteHandle {
        self.on(filter::callback_prefix(prefix), handlers)
    }

    pub fn on_inline_prefix(
        &self,
        prefix: impl Into<String>,
        handlers: impl IntoIterator<Item = BoxedHandler>,
    ) -> RouteHandle {
        self.on(filter::inline_query_prefix(prefix), handlers)
    }

    filter_sugar! {
        /// Registers a route that matches every update.
        on_update => any_update;
        on_message => message;
        on_callback_query => callback_query;
        on_inline_query => inline_query;
        on_my_chat_member => my_chat_member;
        on_chat_member => chat_member;
        on_pre_checkout_query => pre_checkout_query;
        on_successful_payment => successful_payment;
        on_forwarded_channel_message => forwarded_channel_message;
        on_photo => photo;
        on_audio => audio;
        on_document => document;
        on_sticker => sticker;
        on_video => video;
        on_voice => voice;
        on_video_note => video_note;
        on_animation => animation;
        on_purchased_paid_media => purchased_paid_media;
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// A snapshot of the route table, in matching order.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.node.shared.routes.read().clone()
    }

    pub fn route_count(&self) -> usize {
        self.node.shared.routes.read().len()
    }

    /// The context pool of this router tree.
    pub fn context_pool(&self) -> &ContextPool {
        &self.node.shared.pool
    }

    pub(crate) fn route_at(&self, index: usize) -> Option<Arc<Route>> {
        self.node.shared.routes.read().get(index).cloned()
    }

    pub(crate) fn middleware_at(&self, index: usize) -> Option<BoxedHandler> {
        self.node.middleware.read().get(index).cloned()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatches one update through middleware and the route table.
    ///
    /// Returns the error the chain ended with, or `Ok(())` when an error
    /// handler is configured. Fails with
    /// [`RouterError::GroupCannotHandleUpdates`] on a child view.
    pub async fn handle_update(&self, update: Update, cancel: CancellationToken) -> HandlerResult {
        self.dispatch(update, None, cancel).await
    }

    /// Like [`handle_update`](Self::handle_update), with a bot overriding the
    /// router's default for this dispatch.
    pub async fn handle_update_with_bot(
        &self,
        update: Update,
        bot: Bot,
        cancel: CancellationToken,
    ) -> HandlerResult {
        self.dispatch(update, Some(bot), cancel).await
    }

    async fn dispatch(
        &self,
        update: Update,
        bot: Option<Bot>,
        cancel: CancellationToken,
    ) -> HandlerResult {
        if !self.is_root() {
            return Err(RouterError::GroupCannotHandleUpdates.into());
        }

        let shared = &self.node.shared;
        let bot = bot.or_else(|| shared.bot.clone());
        let span = debug_span!(
            "dispatch",
            update_id = update.update_id,
            kind = update.kind().map(|k| k.as_str()).unwrap_or("unknown"),
        );

        async move {
            let guard = shared.pool.acquire(update, Some(self.clone()), bot, cancel);
            let ctx = guard.context();

            let result = match &shared.cancel_handler {
                Some(handler) => handler.call(ctx.clone()).await,
                None => ctx.next().await,
            };

            match (result, &shared.error_handler) {
                (Ok(()), _) => {
                    trace!("Dispatch completed");
                    Ok(())
                }
                (Err(err), Some(handler)) => {
                    debug!(error = %err, "Dispatch failed, passing error to error handler");
                    handler.call(ctx.clone(), err).await;
                    Ok(())
                }
                (Err(err), None) => {
                    debug!(error = %err, "Dispatch failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl UpdateHandler for Router {
    async fn handle_update(&self, update: Update, cancel: CancellationToken) -> Result<(), BoxError> {
        Router::handle_update(self, update, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::handler;
    use crate::handlers;
    use parking_lot::Mutex;
    use pewter_core::{
        ApiResult, BotClient, Message, ParseMode, RequestOptions, User,
    };
    use serde_json::{Map, Value};
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("sentinel")]
    struct Sentinel;

    type Log = Arc<Mutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// A handler that records `name` and optionally continues the chain.
    fn record(log: &Log, name: &'static str, continue_chain: bool) -> BoxedHandler {
        let log = log.clone();
        handler(move |ctx: Context| {
            let log = log.clone();
            async move {
                log.lock().push(name.to_string());
                if continue_chain {
                    ctx.next().await
                } else {
                    Ok(())
                }
            }
        })
    }

    /// Middleware that copies the state tag from the message text after `state:`.
    fn state_from_text() -> BoxedHandler {
        handler(|ctx: Context| async move {
            let tag = ctx
                .message()
                .and_then(|m| m.text.as_deref())
                .and_then(|t| t.strip_prefix("state:"))
                .map(str::to_string);
            if let Some(tag) = tag {
                ctx.set_state(tag);
            }
            ctx.next().await
        })
    }

    fn text(text: &str) -> Update {
        Update::from_message(1, Message::text(10, text))
    }

    async fn dispatch(router: &Router, update: Update) -> HandlerResult {
        router.handle_update(update, CancellationToken::new()).await
    }

    fn route_not_found(result: HandlerResult) -> bool {
        matches!(
            result.as_ref().map_err(RouterError::from_boxed),
            Err(Some(RouterError::RouteNotFound))
        )
    }

    #[tokio::test]
    async fn handler_error_is_returned_verbatim() {
        let router = Router::new();
        router.on_command(
            "test",
            handlers![|_ctx: Context| async move { Err(Sentinel.into()) }],
        );

        let err = dispatch(&router, text("/test")).await.unwrap_err();
        assert!(err.downcast_ref::<Sentinel>().is_some());
    }

    #[tokio::test]
    async fn unmatched_update_reports_route_not_found() {
        let router = Router::new();
        router.on_command("test", handlers![|_ctx: Context| async move { Ok(()) }]);

        let empty = Update::from_message(1, Message::default());
        assert!(route_not_found(dispatch(&router, empty).await));
        assert!(route_not_found(dispatch(&router, Update::default()).await));
    }

    #[tokio::test]
    async fn middleware_then_route_handlers_run_in_order() {
        let log = new_log();
        let router = Router::new();
        router.use_middleware([record(&log, "m1", true), record(&log, "m2", true)]);
        router.on_command("test", [record(&log, "h1", true), record(&log, "h2", true)]);

        dispatch(&router, text("/test")).await.unwrap();
        assert_eq!(*log.lock(), ["m1", "m2", "h1", "h2"]);
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let log = new_log();
        let router = Router::new();
        router.use_middleware([record(&log, "gate", false)]);
        router.on_message([record(&log, "handler", true)]);

        dispatch(&router, text("hi")).await.unwrap();
        assert_eq!(*log.lock(), ["gate"]);
    }

    #[tokio::test]
    async fn handler_that_does_not_continue_stops_the_route() {
        let log = new_log();
        let router = Router::new();
        router.on_message([record(&log, "first", false), record(&log, "second", true)]);
        router.on_update([record(&log, "fallback", true)]);

        dispatch(&router, text("hi")).await.unwrap();
        assert_eq!(*log.lock(), ["first"]);
    }

    #[tokio::test]
    async fn route_without_handlers_completes() {
        let router = Router::new();
        router.on_message(handlers![]);
        assert!(dispatch(&router, text("hi")).await.is_ok());
    }

    #[tokio::test]
    async fn first_registered_route_wins_across_views() {
        let log = new_log();
        let router = Router::new();
        let outer = router.group(handlers![]);
        let inner = outer.group(handlers![]);

        inner.on_message([record(&log, "nested", true)]);
        router.on_message([record(&log, "root", true)]);

        dispatch(&router, text("hi")).await.unwrap();
        assert_eq!(*log.lock(), ["nested"]);

        let log = new_log();
        let router = Router::new();
        router.on_message([record(&log, "root", true)]);
        router.group(handlers![]).on_message([record(&log, "group", true)]);

        dispatch(&router, text("hi")).await.unwrap();
        assert_eq!(*log.lock(), ["root"]);
        assert_eq!(router.route_count(), 2);
    }

    #[tokio::test]
    async fn state_scoped_routes_require_exact_state() {
        let log = new_log();
        let router = Router::new();
        router.use_middleware([state_from_text()]);
        router
            .use_state("admin", handlers![])
            .on_message([record(&log, "admin", true)]);
        router.on_message([record(&log, "default", true)]);

        dispatch(&router, text("hello")).await.unwrap();
        dispatch(&router, text("state:guest")).await.unwrap();
        dispatch(&router, text("state:administrator")).await.unwrap();
        dispatch(&router, text("state:admin")).await.unwrap();

        assert_eq!(*log.lock(), ["default", "default", "default", "admin"]);
    }

    #[tokio::test]
    async fn groups_inherit_state_requirement() {
        let log = new_log();
        let router = Router::new();
        router.use_middleware([state_from_text()]);
        let admin = router.use_state("admin", handlers![]);
        let tools = admin.group([record(&log, "tools-mw", true)]);
        tools.on_message([record(&log, "tools", true)]);
        assert_eq!(tools.state(), Some("admin"));

        assert!(route_not_found(dispatch(&router, text("hello")).await));
        dispatch(&router, text("state:admin")).await.unwrap();
        assert_eq!(*log.lock(), ["tools-mw", "tools"]);
    }

    #[tokio::test]
    async fn group_middleware_only_wraps_its_own_routes() {
        let log = new_log();
        let router = Router::new();
        let group = router.group([record(&log, "group-mw", true)]);
        group.on_command("a", [record(&log, "a", true)]);
        router.on_command("b", [record(&log, "b", true)]);

        dispatch(&router, text("/b")).await.unwrap();
        assert_eq!(*log.lock(), ["b"]);

        log.lock().clear();
        dispatch(&router, text("/a")).await.unwrap();
        assert_eq!(*log.lock(), ["group-mw", "a"]);
    }

    #[tokio::test]
    async fn nested_group_runs_only_its_own_middleware() {
        let log = new_log();
        let router = Router::new();
        let outer = router.group([record(&log, "outer-mw", true)]);
        let inner = outer.group([record(&log, "inner-mw", true)]);
        inner.on_message([record(&log, "handler", true)]);

        dispatch(&router, text("hi")).await.unwrap();
        assert_eq!(*log.lock(), ["inner-mw", "handler"]);
    }

    #[tokio::test]
    async fn group_under_state_view_skips_state_middleware() {
        let log = new_log();
        let router = Router::new();
        router.use_middleware([state_from_text()]);
        let admin = router.use_state("admin", [record(&log, "require-admin", true)]);
        let audit = admin.group([record(&log, "audit", true)]);
        audit.on_message([record(&log, "handler", true)]);

        dispatch(&router, text("state:admin")).await.unwrap();
        assert_eq!(*log.lock(), ["audit", "handler"]);
    }

    #[tokio::test]
    async fn child_middleware_is_captured_at_registration() {
        let log = new_log();
        let router = Router::new();
        let group = router.group(handlers![]);
        group.on_command("early", [record(&log, "early", true)]);
        group.use_middleware([record(&log, "late-mw", true)]);
        group.on_command("late", [record(&log, "late", true)]);

        dispatch(&router, text("/early")).await.unwrap();
        dispatch(&router, text("/late")).await.unwrap();
        assert_eq!(*log.lock(), ["early", "late-mw", "late"]);
    }

    #[tokio::test]
    async fn contexts_are_reset_between_dispatches() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new();
        router.on_command(
            "set",
            handlers![|ctx: Context| async move {
                ctx.set_state("dirty");
                ctx.set_parse_mode(ParseMode::Html);
                Ok(())
            }],
        );
        let observed = seen.clone();
        router.on_update([handler(move |ctx: Context| {
            let observed = observed.clone();
            async move {
                observed.lock().push((ctx.state(), ctx.parse_mode()));
                Ok(())
            }
        })]);

        dispatch(&router, text("/set")).await.unwrap();
        assert_eq!(router.context_pool().idle(), 1);
        dispatch(&router, text("other")).await.unwrap();

        assert_eq!(*seen.lock(), vec![(None::<String>, None::<ParseMode>)]);
        assert_eq!(router.context_pool().idle(), 1);
    }

    #[tokio::test]
    async fn error_handler_swallows_errors() {
        let reported = new_log();
        let sink = reported.clone();
        let router = Router::builder()
            .error_handler(move |ctx: Context, err: BoxError| {
                let sink = sink.clone();
                async move {
                    sink.lock()
                        .push(format!("{}:{}", ctx.update().update_id, err));
                }
            })
            .build();
        router.on_command(
            "fail",
            handlers![|_ctx: Context| async move { Err(Sentinel.into()) }],
        );

        assert!(dispatch(&router, text("/fail")).await.is_ok());
        assert!(dispatch(&router, text("unrouted")).await.is_ok());
        assert_eq!(*reported.lock(), ["1:sentinel", "1:route not found"]);
    }

    #[tokio::test]
    async fn child_views_cannot_dispatch() {
        let router = Router::new();
        router.on_update(handlers![]);

        for view in [router.group(handlers![]), router.use_state("s", handlers![])] {
            assert!(!view.is_root());
            let err = dispatch(&view, text("hi")).await.unwrap_err();
            assert_eq!(
                RouterError::from_boxed(&err),
                Some(&RouterError::GroupCannotHandleUpdates)
            );
        }
    }

    #[tokio::test]
    async fn route_names_are_visible_in_context() {
        let names = new_log();
        let sink = names.clone();
        let router = Router::new();
        router
            .on_message([handler(move |ctx: Context| {
                let sink = sink.clone();
                async move {
                    let name = ctx.route().and_then(|r| r.name()).unwrap_or_default();
                    sink.lock().push(name);
                    Ok(())
                }
            })])
            .name("echo");

        dispatch(&router, text("hi")).await.unwrap();
        assert_eq!(*names.lock(), ["echo"]);
        assert_eq!(router.routes()[0].name().as_deref(), Some("echo"));
    }

    struct NullClient;

    #[async_trait]
    impl BotClient for NullClient {
        async fn request(
            &self,
            _token: &str,
            _method: &str,
            _params: Map<String, Value>,
            _opts: Option<&RequestOptions>,
        ) -> ApiResult<Value> {
            Ok(Value::Bool(true))
        }

        fn api_url(&self, _opts: Option<&RequestOptions>) -> String {
            String::new()
        }
    }

    fn named_bot(username: &str) -> Bot {
        Bot::new("1:t", Arc::new(NullClient)).with_user(User {
            id: 1,
            is_bot: true,
            username: Some(username.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn command_with_at_uses_the_dispatch_bot() {
        let log = new_log();
        let router = Router::builder().bot(named_bot("pewter_bot")).build();
        router.on_command_with_at("help", [record(&log, "help", true)]);

        dispatch(&router, text("/help@pewter_bot")).await.unwrap();
        assert!(route_not_found(dispatch(&router, text("/help@other_bot")).await));
        assert!(route_not_found(dispatch(&router, text("/help")).await));

        router
            .handle_update_with_bot(
                text("/help@other_bot"),
                named_bot("other_bot"),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(*log.lock(), ["help", "help"]);
    }

    #[tokio::test]
    async fn command_with_at_never_matches_without_a_bot() {
        let router = Router::new();
        router.on_command_with_at("help", handlers![]);
        assert!(route_not_found(dispatch(&router, text("/help@pewter_bot")).await));
    }

    #[tokio::test]
    async fn router_is_an_update_handler() {
        let log = new_log();
        let router = Router::new();
        router.on_message([record(&log, "via-trait", true)]);

        let handler: Arc<dyn UpdateHandler> = Arc::new(router);
        handler
            .handle_update(text("hi"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*log.lock(), ["via-trait"]);
    }
}
