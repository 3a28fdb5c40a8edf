//! Per-dispatch event context.
//!
//! A [`Context`] is created for every update a router dispatches. It carries
//! the update, the bot that received it, the conversation state tag and the
//! position of the dispatch in the middleware and route chains.
//!
//! `Context` is a cheap handle over pooled storage. Handlers receive it by
//! value and can clone it, but a clone should not outlive the dispatch: the
//! storage is recycled by the [`ContextPool`] once the dispatch ends, unless a
//! clone is still alive, in which case that storage is simply dropped instead.
//!
//! # Chain Position
//!
//! Two cursors drive [`Context::next`]:
//!
//! - the middleware cursor walks the root router's middleware;
//! - once a route matched, the handler cursor walks that route's chain.
//!
//! Route matching resumes from where the previous scan stopped, so a context
//! only ever moves forward through the route table.

use std::sync::Arc;

use parking_lot::Mutex;
use pewter_core::{
    AnswerCallbackQueryOptions, ApiError, ApiResult, Bot, Chat, DeleteMessageOptions,
    EditMessageTextOptions, Message, ParseMode, ReactionType, SendMessageOptions,
    SetMessageReactionOptions, Update, User,
};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::{HandlerResult, RouterError};
use crate::handler::{BoxFuture, BoxedHandler};
use crate::route::Route;
use crate::router::Router;

// =============================================================================
// Storage
// =============================================================================

#[derive(Default)]
struct DispatchState {
    route: Option<Arc<Route>>,
    /// Next route table index to test.
    route_cursor: usize,
    /// Next root middleware to run.
    middleware_index: usize,
    /// Next handler of the matched route to run.
    handler_index: usize,
    state: Option<String>,
    parse_mode: Option<ParseMode>,
}

pub(crate) struct ContextInner {
    update: Update,
    router: Option<Router>,
    bot: Option<Bot>,
    cancel: Mutex<CancellationToken>,
    dispatch: Mutex<DispatchState>,
}

impl ContextInner {
    fn new(
        update: Update,
        router: Option<Router>,
        bot: Option<Bot>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            update,
            router,
            bot,
            cancel: Mutex::new(cancel),
            dispatch: Mutex::new(DispatchState::default()),
        }
    }

    fn bind(
        &mut self,
        update: Update,
        router: Option<Router>,
        bot: Option<Bot>,
        cancel: CancellationToken,
    ) {
        self.update = update;
        self.router = router;
        self.bot = bot;
        *self.cancel.get_mut() = cancel;
        *self.dispatch.get_mut() = DispatchState::default();
    }

    /// Drops everything the previous dispatch bound, including the router
    /// reference that would otherwise keep the router alive from its own pool.
    fn clear(&mut self) {
        self.update = Update::default();
        self.router = None;
        self.bot = None;
        *self.cancel.get_mut() = CancellationToken::new();
        *self.dispatch.get_mut() = DispatchState::default();
    }
}

// =============================================================================
// Context
// =============================================================================

/// The context handed to every handler and filter.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dispatch = self.inner.dispatch.lock();
        f.debug_struct("Context")
            .field("update_id", &self.inner.update.update_id)
            .field("state", &dispatch.state)
            .field("route", &dispatch.route.as_ref().and_then(|r| r.name()))
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Creates a context that is not attached to any router.
    ///
    /// Useful for evaluating filters and testing handlers in isolation.
    /// Calling [`next`](Self::next) on it fails with
    /// [`RouterError::RouteNotFound`].
    pub fn detached(update: Update) -> Self {
        Self::from_inner(ContextInner::new(
            update,
            None,
            None,
            CancellationToken::new(),
        ))
    }

    /// Like [`detached`](Self::detached), with a bot for outbound helpers.
    pub fn detached_with_bot(update: Update, bot: Bot) -> Self {
        Self::from_inner(ContextInner::new(
            update,
            None,
            Some(bot),
            CancellationToken::new(),
        ))
    }

    fn from_inner(inner: ContextInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn update(&self) -> &Update {
        &self.inner.update
    }

    /// The bot that received this update, if one is known.
    pub fn bot(&self) -> Option<&Bot> {
        self.inner.bot.as_ref()
    }

    /// The root router performing this dispatch.
    pub fn router(&self) -> Option<&Router> {
        self.inner.router.as_ref()
    }

    /// The cancellation token of this dispatch.
    pub fn cancellation(&self) -> CancellationToken {
        self.inner.cancel.lock().clone()
    }

    /// Replaces the cancellation token seen by the rest of the chain.
    pub fn set_cancellation(&self, token: CancellationToken) {
        *self.inner.cancel.lock() = token;
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.cancel.lock().is_cancelled()
    }

    /// The conversation state tag, `None` until a handler sets one.
    pub fn state(&self) -> Option<String> {
        self.inner.dispatch.lock().state.clone()
    }

    pub fn set_state(&self, state: impl Into<String>) {
        self.inner.dispatch.lock().state = Some(state.into());
    }

    pub fn clear_state(&self) {
        self.inner.dispatch.lock().state = None;
    }

    /// The default parse mode applied by [`reply`](Self::reply) and
    /// [`edit_message_text`](Self::edit_message_text).
    pub fn parse_mode(&self) -> Option<ParseMode> {
        self.inner.dispatch.lock().parse_mode
    }

    pub fn set_parse_mode(&self, mode: ParseMode) {
        self.inner.dispatch.lock().parse_mode = Some(mode);
    }

    /// The route matched so far, if any.
    pub fn route(&self) -> Option<Arc<Route>> {
        self.inner.dispatch.lock().route.clone()
    }

    // =========================================================================
    // Chain Control
    // =========================================================================

    /// Runs the next step of the dispatch and returns its result.
    ///
    /// Before a route has matched this runs the next root middleware, and once
    /// the middleware is exhausted it matches the next route and runs its
    /// first handler. After a match it runs the route's next handler, and
    /// returns `Ok(())` when the chain is exhausted. Fails with
    /// [`RouterError::RouteNotFound`] when no remaining route accepts the
    /// update.
    pub fn next(&self) -> BoxFuture<'static, HandlerResult> {
        match self.advance() {
            Ok(Some(handler)) => handler.call(self.clone()),
            Ok(None) => Box::pin(std::future::ready(Ok(()))),
            Err(err) => Box::pin(std::future::ready(Err(err.into()))),
        }
    }

    /// Moves the cursors forward and returns the handler to run next.
    fn advance(&self) -> Result<Option<BoxedHandler>, RouterError> {
        let Some(router) = self.inner.router.as_ref() else {
            return Err(RouterError::RouteNotFound);
        };

        let start = {
            let mut dispatch = self.inner.dispatch.lock();
            if let Some(route) = dispatch.route.clone() {
                let next = route.handler(dispatch.handler_index);
                if next.is_some() {
                    dispatch.handler_index += 1;
                }
                return Ok(next);
            }
            if let Some(middleware) = router.middleware_at(dispatch.middleware_index) {
                dispatch.middleware_index += 1;
                return Ok(Some(middleware));
            }
            dispatch.route_cursor
        };

        // Filters read the context, so the dispatch lock is released while
        // scanning.
        let mut index = start;
        while let Some(route) = router.route_at(index) {
            index += 1;
            if !route.matches(self) {
                continue;
            }
            trace!(
                update_id = self.inner.update.update_id,
                route_index = index - 1,
                route = route.name().as_deref().unwrap_or("unnamed"),
                "Route matched"
            );
            let first = route.handler(0);
            let mut dispatch = self.inner.dispatch.lock();
            dispatch.route_cursor = index;
            dispatch.handler_index = usize::from(first.is_some());
            dispatch.route = Some(route);
            return Ok(first);
        }

        self.inner.dispatch.lock().route_cursor = index;
        Err(RouterError::RouteNotFound)
    }

    // =========================================================================
    // Getters
    // =========================================================================

    /// The message carried by the update.
    ///
    /// Covers messages, edits, channel posts and the (still accessible)
    /// message of a callback query.
    pub fn message(&self) -> Option<&Message> {
        let update = &self.inner.update;
        update
            .message
            .as_ref()
            .or(update.edited_message.as_ref())
            .or(update.channel_post.as_ref())
            .or(update.edited_channel_post.as_ref())
            .or_else(|| {
                update
                    .callback_query
                    .as_ref()
                    .and_then(|q| q.message.as_ref())
                    .and_then(|m| m.accessible())
            })
    }

    /// The identifier of the update's message, including inaccessible
    /// callback messages.
    pub fn message_id(&self) -> Option<i64> {
        self.message().map(|m| m.message_id).or_else(|| {
            self.inner
                .update
                .callback_query
                .as_ref()
                .and_then(|q| q.message.as_ref())
                .map(|m| m.message_id())
        })
    }

    /// The user who caused the update.
    pub fn sender(&self) -> Option<&User> {
        let update = &self.inner.update;
        if let Some(query) = &update.callback_query {
            return Some(&query.from);
        }
        if let Some(message) = self.message() {
            return message.from.as_ref();
        }
        if let Some(query) = &update.inline_query {
            return Some(&query.from);
        }
        if let Some(query) = &update.shipping_query {
            return Some(&query.from);
        }
        if let Some(query) = &update.pre_checkout_query {
            return Some(&query.from);
        }
        if let Some(answer) = &update.poll_answer {
            return answer.user.as_ref();
        }
        if let Some(member) = &update.my_chat_member {
            return Some(&member.from);
        }
        if let Some(member) = &update.chat_member {
            return Some(&member.from);
        }
        update.chat_join_request.as_ref().map(|r| &r.from)
    }

    /// The chat the update happened in.
    pub fn chat(&self) -> Option<&Chat> {
        let update = &self.inner.update;
        if let Some(message) = self.message() {
            return Some(&message.chat);
        }
        if let Some(message) = update.callback_query.as_ref().and_then(|q| q.message.as_ref()) {
            return Some(message.chat());
        }
        update
            .my_chat_member
            .as_ref()
            .map(|m| &m.chat)
            .or(update.chat_member.as_ref().map(|m| &m.chat))
            .or(update.chat_join_request.as_ref().map(|r| &r.chat))
    }

    /// The chat identifier, falling back to the sender's identifier.
    pub fn chat_id(&self) -> Option<i64> {
        self.chat()
            .map(|c| c.id)
            .or_else(|| self.sender().map(|u| u.id))
    }

    /// Space separated words after the command in a message.
    pub fn command_args(&self) -> Vec<&str> {
        self.inner
            .update
            .message
            .as_ref()
            .and_then(|m| m.text.as_deref())
            .map(|text| text.split(' ').skip(1).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Outbound Actions
    // =========================================================================

    fn require_bot(&self) -> ApiResult<&Bot> {
        self.bot().ok_or(ApiError::NoBot)
    }

    fn require_chat_id(&self) -> ApiResult<i64> {
        self.chat_id().ok_or(ApiError::MissingField("chat"))
    }

    fn require_message_id(&self) -> ApiResult<i64> {
        self.message_id().ok_or(ApiError::MissingField("message"))
    }

    /// Runs an API call, giving up when the dispatch is canceled.
    async fn cancellable<T>(
        &self,
        call: impl std::future::Future<Output = ApiResult<T>>,
    ) -> ApiResult<T> {
        let token = self.cancellation();
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ApiError::Canceled),
            result = call => result,
        }
    }

    /// Sends a text message to the update's chat.
    pub async fn reply(&self, text: &str) -> ApiResult<Message> {
        self.reply_with(text, SendMessageOptions::default()).await
    }

    /// Sends a text message with explicit options.
    ///
    /// The context's parse mode, when set, replaces the one in `opts`.
    pub async fn reply_with(&self, text: &str, mut opts: SendMessageOptions) -> ApiResult<Message> {
        let bot = self.require_bot()?;
        let chat_id = self.require_chat_id()?;
        if let Some(mode) = self.parse_mode() {
            opts.parse_mode = Some(mode);
        }
        self.cancellable(bot.send_message(chat_id, text, Some(&opts)))
            .await
    }

    /// Sends a text message with a reply markup (keyboard).
    pub async fn reply_with_markup(
        &self,
        text: &str,
        markup: serde_json::Value,
    ) -> ApiResult<Message> {
        let opts = SendMessageOptions {
            reply_markup: Some(markup),
            ..Default::default()
        };
        self.reply_with(text, opts).await
    }

    /// Answers the update's callback query. An empty `text` sends no notice.
    pub async fn answer(&self, text: &str) -> ApiResult<bool> {
        self.answer_with(text, AnswerCallbackQueryOptions::default())
            .await
    }

    /// Answers the callback query with an alert dialog instead of a toast.
    pub async fn answer_alert(&self, text: &str) -> ApiResult<bool> {
        let opts = AnswerCallbackQueryOptions {
            show_alert: true,
            ..Default::default()
        };
        self.answer_with(text, opts).await
    }

    async fn answer_with(
        &self,
        text: &str,
        mut opts: AnswerCallbackQueryOptions,
    ) -> ApiResult<bool> {
        let bot = self.require_bot()?;
        let query = self
            .inner
            .update
            .callback_query
            .as_ref()
            .ok_or(ApiError::MissingField("callback query"))?;
        if !text.is_empty() {
            opts.text = Some(text.to_string());
        }
        self.cancellable(bot.answer_callback_query(&query.id, Some(&opts)))
            .await
    }

    /// Deletes the update's message.
    pub async fn delete_message(&self) -> ApiResult<bool> {
        let bot = self.require_bot()?;
        let chat_id = self.require_chat_id()?;
        let message_id = self.require_message_id()?;
        self.cancellable(bot.delete_message(chat_id, message_id, None::<&DeleteMessageOptions>))
            .await
    }

    /// Replaces the text of the update's message.
    pub async fn edit_message_text(&self, text: &str) -> ApiResult<Option<Message>> {
        let bot = self.require_bot()?;
        let opts = EditMessageTextOptions {
            chat_id: Some(self.require_chat_id()?),
            message_id: Some(self.require_message_id()?),
            parse_mode: self.parse_mode(),
            ..Default::default()
        };
        self.cancellable(bot.edit_message_text(text, &opts)).await
    }

    /// Reacts to the update's message with emoji.
    pub async fn react(&self, emoji: &[&str]) -> ApiResult<bool> {
        self.set_reaction(emoji, false).await
    }

    /// Like [`react`](Self::react), with the big animation.
    pub async fn react_big(&self, emoji: &[&str]) -> ApiResult<bool> {
        self.set_reaction(emoji, true).await
    }

    async fn set_reaction(&self, emoji: &[&str], is_big: bool) -> ApiResult<bool> {
        let bot = self.require_bot()?;
        let chat_id = self.require_chat_id()?;
        let message_id = self.require_message_id()?;
        let opts = SetMessageReactionOptions {
            reaction: emoji.iter().map(|e| ReactionType::emoji(*e)).collect(),
            is_big,
            ..Default::default()
        };
        self.cancellable(bot.set_message_reaction(chat_id, message_id, Some(&opts)))
            .await
    }
}

// =============================================================================
// Context Pool
// =============================================================================

/// Idle contexts kept by default.
pub const DEFAULT_MAX_IDLE: usize = 128;

/// A thread-safe free list of context storage.
///
/// Storage is reset when acquired and cleared when released. Released storage
/// is only kept if no clone of the context survived the dispatch.
pub struct ContextPool {
    free: Mutex<Vec<Arc<ContextInner>>>,
    max_idle: usize,
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("idle", &self.idle())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

impl ContextPool {
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Creates a pool that keeps at most `max_idle` released contexts.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Number of contexts waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Takes a context for one dispatch. It returns to the pool when the
    /// guard drops.
    pub(crate) fn acquire(
        self: &Arc<Self>,
        update: Update,
        router: Option<Router>,
        bot: Option<Bot>,
        cancel: CancellationToken,
    ) -> ContextGuard {
        let recycled = self.free.lock().pop();
        if let Some(mut inner) = recycled {
            if let Some(slot) = Arc::get_mut(&mut inner) {
                slot.bind(update, router, bot, cancel);
                return self.guard(inner);
            }
        }
        self.guard(Arc::new(ContextInner::new(update, router, bot, cancel)))
    }

    fn guard(self: &Arc<Self>, inner: Arc<ContextInner>) -> ContextGuard {
        ContextGuard {
            ctx: Some(Context { inner }),
            pool: Arc::clone(self),
        }
    }

    fn release(&self, mut inner: Arc<ContextInner>) {
        let Some(slot) = Arc::get_mut(&mut inner) else {
            trace!("Context retained past its dispatch, not recycling");
            return;
        };
        slot.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(inner);
        }
    }
}

/// Owns a pooled context for the duration of one dispatch.
pub(crate) struct ContextGuard {
    ctx: Option<Context>,
    pool: Arc<ContextPool>,
}

impl ContextGuard {
    pub(crate) fn context(&self) -> &Context {
        match &self.ctx {
            Some(ctx) => ctx,
            None => unreachable!("context is only taken on drop"),
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx.inner);
        }
    }
}
