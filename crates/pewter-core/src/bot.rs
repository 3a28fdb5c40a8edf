//! Bot handle and the outbound API methods the framework relies on.
//!
//! A [`Bot`] pairs a token with a [`BotClient`]. It is cheap to clone and is
//! shared freely between workers and contexts.
//!
//! # Example
//!
//! ```rust,ignore
//! let bot = Bot::new(token, Arc::new(HttpBotClient::new())).verify().await?;
//! bot.send_message(chat_id, "hello", None).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::trace;

use crate::client::{BotClient, RequestOptions, UpdateFetcher};
use crate::error::{ApiError, ApiResult};
use crate::model::{Chat, Message, ParseMode, ReactionType, Update, User};

// =============================================================================
// Method Options
// =============================================================================

/// Parameters for `getUpdates`.
#[derive(Debug, Clone, Serialize)]
pub struct GetUpdatesOptions {
    /// First update identifier to return.
    pub offset: i64,
    /// Maximum number of updates per batch; `None` uses the server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Long-poll timeout in seconds.
    pub timeout: i64,
    /// Update variant names to receive; empty means the server default.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_updates: Vec<String>,
}

impl Default for GetUpdatesOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: None,
            timeout: 600,
            allowed_updates: Vec::new(),
        }
    }
}

/// Optional parameters for `sendMessage`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SendMessageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_parameters: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable_notification: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub protect_content: bool,
    #[serde(skip)]
    pub request: Option<RequestOptions>,
}

/// Optional parameters for `answerCallbackQuery`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnswerCallbackQueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_alert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_time: Option<i64>,
    #[serde(skip)]
    pub request: Option<RequestOptions>,
}

/// Optional parameters for `editMessageText`.
///
/// Set either `chat_id` and `message_id`, or `inline_message_id`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditMessageTextOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<Value>,
    #[serde(skip)]
    pub request: Option<RequestOptions>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteMessageOptions {
    pub request: Option<RequestOptions>,
}

/// Optional parameters for `setMessageReaction`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetMessageReactionOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reaction: Vec<ReactionType>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_big: bool,
    #[serde(skip)]
    pub request: Option<RequestOptions>,
}

/// Optional parameters for `setWebhook`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SetWebhookOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_updates: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub drop_pending_updates: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<String>,
    #[serde(skip)]
    pub request: Option<RequestOptions>,
}

// =============================================================================
// Bot
// =============================================================================

/// An authenticated handle to the remote bot API.
#[derive(Clone)]
pub struct Bot {
    token: Arc<str>,
    client: Arc<dyn BotClient>,
    user: Option<Arc<User>>,
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The token is a credential; never print it.
        f.debug_struct("Bot")
            .field("user", &self.user.as_ref().map(|u| u.id))
            .finish_non_exhaustive()
    }
}

impl Bot {
    /// Creates a bot without contacting the remote API.
    pub fn new(token: impl Into<String>, client: Arc<dyn BotClient>) -> Self {
        Self {
            token: Arc::from(token.into()),
            client,
            user: None,
        }
    }

    /// Attaches an already known bot identity.
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(Arc::new(user));
        self
    }

    /// Checks the token with `getMe` and caches the returned identity.
    pub async fn verify(self) -> ApiResult<Self> {
        let me = self.get_me(None).await?;
        Ok(self.with_user(me))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn client(&self) -> &Arc<dyn BotClient> {
        &self.client
    }

    /// The cached bot identity, if known.
    pub fn user(&self) -> Option<&User> {
        self.user.as_deref()
    }

    /// The cached bot username, used by `@mention`-aware command filters.
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.username.as_deref())
    }

    /// Calls an arbitrary API method and decodes its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Map<String, Value>,
        opts: Option<&RequestOptions>,
    ) -> ApiResult<T> {
        trace!(method, "calling bot api");
        let raw = self.client.request(&self.token, method, params, opts).await?;
        Ok(serde_json::from_value(raw)?)
    }

    pub async fn get_me(&self, opts: Option<&RequestOptions>) -> ApiResult<User> {
        self.call("getMe", Map::new(), opts).await
    }

    pub async fn get_updates(
        &self,
        params: &GetUpdatesOptions,
        opts: Option<&RequestOptions>,
    ) -> ApiResult<Vec<Update>> {
        self.call("getUpdates", to_params(Map::new(), params)?, opts)
            .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        opts: Option<&SendMessageOptions>,
    ) -> ApiResult<Message> {
        let base = object([("chat_id", json!(chat_id)), ("text", json!(text))]);
        let (params, req) = match opts {
            Some(o) => (to_params(base, o)?, o.request.as_ref()),
            None => (base, None),
        };
        self.call("sendMessage", params, req).await
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        opts: Option<&AnswerCallbackQueryOptions>,
    ) -> ApiResult<bool> {
        let base = object([("callback_query_id", json!(callback_query_id))]);
        let (params, req) = match opts {
            Some(o) => (to_params(base, o)?, o.request.as_ref()),
            None => (base, None),
        };
        self.call("answerCallbackQuery", params, req).await
    }

    pub async fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
        opts: Option<&DeleteMessageOptions>,
    ) -> ApiResult<bool> {
        let params = object([
            ("chat_id", json!(chat_id)),
            ("message_id", json!(message_id)),
        ]);
        let req = opts.and_then(|o| o.request.as_ref());
        self.call("deleteMessage", params, req).await
    }

    /// Edits a message's text.
    ///
    /// Returns `None` when an inline message was edited, since the remote API
    /// answers with `true` instead of the message in that case.
    pub async fn edit_message_text(
        &self,
        text: &str,
        opts: &EditMessageTextOptions,
    ) -> ApiResult<Option<Message>> {
        let params = to_params(object([("text", json!(text))]), opts)?;
        let raw: Value = self
            .call("editMessageText", params, opts.request.as_ref())
            .await?;
        match raw {
            Value::Bool(_) => Ok(None),
            other => Ok(Some(serde_json::from_value(other)?)),
        }
    }

    pub async fn set_message_reaction(
        &self,
        chat_id: i64,
        message_id: i64,
        opts: Option<&SetMessageReactionOptions>,
    ) -> ApiResult<bool> {
        let base = object([
            ("chat_id", json!(chat_id)),
            ("message_id", json!(message_id)),
        ]);
        let (params, req) = match opts {
            Some(o) => (to_params(base, o)?, o.request.as_ref()),
            None => (base, None),
        };
        self.call("setMessageReaction", params, req).await
    }

    pub async fn set_webhook(
        &self,
        url: &str,
        opts: Option<&SetWebhookOptions>,
    ) -> ApiResult<bool> {
        let base = object([("url", json!(url))]);
        let (params, req) = match opts {
            Some(o) => (to_params(base, o)?, o.request.as_ref()),
            None => (base, None),
        };
        self.call("setWebhook", params, req).await
    }

    pub async fn delete_webhook(
        &self,
        drop_pending_updates: bool,
        opts: Option<&RequestOptions>,
    ) -> ApiResult<bool> {
        let mut params = Map::new();
        if drop_pending_updates {
            params.insert("drop_pending_updates".into(), Value::Bool(true));
        }
        self.call("deleteWebhook", params, opts).await
    }

    /// Looks up a chat by identifier or public `@username`.
    pub async fn get_chat(
        &self,
        chat_id: impl Into<Value>,
        opts: Option<&RequestOptions>,
    ) -> ApiResult<Chat> {
        let params = object([("chat_id", chat_id.into())]);
        self.call("getChat", params, opts).await
    }

    /// Download URL for a file path obtained from `getFile`.
    pub fn file_url(&self, path: &str, opts: Option<&RequestOptions>) -> String {
        self.client.file_url(&self.token, path, opts)
    }
}

#[async_trait]
impl UpdateFetcher for Bot {
    async fn fetch_updates(
        &self,
        params: &GetUpdatesOptions,
        request_timeout: Option<Duration>,
    ) -> ApiResult<Vec<Update>> {
        let opts = request_timeout.map(|t| RequestOptions::new().with_timeout(t));
        self.get_updates(params, opts.as_ref()).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn object<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn to_params<T: Serialize>(mut base: Map<String, Value>, opts: &T) -> ApiResult<Map<String, Value>> {
    match serde_json::to_value(opts)? {
        Value::Object(extra) => {
            base.extend(extra);
            Ok(base)
        }
        _ => Err(ApiError::Decode("options must serialize to an object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<(String, Map<String, Value>, Option<Duration>)>>,
        reply: Mutex<Value>,
    }

    #[async_trait]
    impl BotClient for RecordingClient {
        async fn request(
            &self,
            _token: &str,
            method: &str,
            params: Map<String, Value>,
            opts: Option<&RequestOptions>,
        ) -> ApiResult<Value> {
            self.calls
                .lock()
                .push((method.to_string(), params, opts.and_then(|o| o.timeout)));
            Ok(self.reply.lock().clone())
        }

        fn api_url(&self, _opts: Option<&RequestOptions>) -> String {
            "https://api.example.org".into()
        }
    }

    fn bot_with(reply: Value) -> (Bot, Arc<RecordingClient>) {
        let client = Arc::new(RecordingClient {
            reply: Mutex::new(reply),
            ..Default::default()
        });
        (Bot::new("42:secret", client.clone()), client)
    }

    #[tokio::test]
    async fn send_message_merges_options() {
        let (bot, client) = bot_with(json!({
            "message_id": 11,
            "date": 1,
            "chat": {"id": 5, "type": "private"},
            "text": "hi"
        }));

        let opts = SendMessageOptions {
            parse_mode: Some(ParseMode::Html),
            disable_notification: true,
            ..Default::default()
        };
        let sent = assert_ok!(bot.send_message(5, "hi", Some(&opts)).await);
        assert_eq!(sent.message_id, 11);

        let calls = client.calls.lock();
        let (method, params, _) = &calls[0];
        assert_eq!(method, "sendMessage");
        assert_eq!(params["chat_id"], json!(5));
        assert_eq!(params["parse_mode"], json!("HTML"));
        assert_eq!(params["disable_notification"], json!(true));
        assert!(!params.contains_key("protect_content"));
    }

    #[tokio::test]
    async fn fetch_updates_passes_request_timeout() {
        let (bot, client) = bot_with(json!([{"update_id": 3}]));

        let params = GetUpdatesOptions {
            offset: 3,
            allowed_updates: vec!["message".into()],
            ..Default::default()
        };
        let updates = bot
            .fetch_updates(&params, Some(Duration::from_secs(605)))
            .await
            .unwrap();
        assert_eq!(updates.len(), 1);

        let calls = client.calls.lock();
        let (method, sent, timeout) = &calls[0];
        assert_eq!(method, "getUpdates");
        assert_eq!(sent["offset"], json!(3));
        assert_eq!(sent["timeout"], json!(600));
        assert_eq!(sent["allowed_updates"], json!(["message"]));
        assert!(!sent.contains_key("limit"));
        assert_eq!(*timeout, Some(Duration::from_secs(605)));
    }

    #[tokio::test]
    async fn verify_caches_username() {
        let (bot, _) = bot_with(json!({
            "id": 1, "is_bot": true, "first_name": "Pewter", "username": "pewter_bot"
        }));
        assert_eq!(bot.username(), None);

        let bot = assert_ok!(bot.verify().await);
        assert_eq!(bot.username(), Some("pewter_bot"));
        assert!(!format!("{bot:?}").contains("secret"));
    }

    #[tokio::test]
    async fn inline_edit_returns_none() {
        let (bot, _) = bot_with(json!(true));
        let opts = EditMessageTextOptions {
            inline_message_id: Some("abc".into()),
            ..Default::default()
        };
        assert_eq!(bot.edit_message_text("new", &opts).await.unwrap(), None);
    }

    #[tokio::test]
    async fn decode_failure_is_reported() {
        let (bot, _) = bot_with(json!("not a user"));
        let err = assert_err!(bot.get_me(None).await);
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn file_url_embeds_token() {
        let (bot, _) = bot_with(Value::Null);
        assert_eq!(
            bot.file_url("docs/a.pdf", None),
            "https://api.example.org/file/bot42:secret/docs/a.pdf"
        );
    }
}
