//! Route filters.
//!
//! A [`Filter`] is a predicate over the [`Context`] that decides whether a
//! route is eligible for the current update. The constructors here cover the
//! common update shapes; [`custom`] wraps anything else.
//!
//! # Example
//!
//! ```rust,ignore
//! use pewter_framework::filters;
//!
//! router.on(
//!     filters::and(filters::message(), filters::not(filters::command("start"))),
//!     handlers![echo],
//! );
//! ```

use std::sync::Arc;

use pewter_core::Message;

use crate::context::Context;

/// A type-erased route predicate.
pub type Filter = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Wraps a closure into a [`Filter`].
pub fn custom<F>(f: F) -> Filter
where
    F: Fn(&Context) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

fn message_text(ctx: &Context) -> Option<&str> {
    ctx.update()
        .message
        .as_ref()
        .map(|m| m.text.as_deref().unwrap_or_default())
}

fn message_has(check: fn(&Message) -> bool) -> Filter {
    Arc::new(move |ctx: &Context| ctx.update().message.as_ref().is_some_and(check))
}

// =============================================================================
// Combinators
// =============================================================================

/// Matches when both filters match.
pub fn and(a: Filter, b: Filter) -> Filter {
    Arc::new(move |ctx: &Context| a(ctx) && b(ctx))
}

/// Matches when either filter matches.
pub fn or(a: Filter, b: Filter) -> Filter {
    Arc::new(move |ctx: &Context| a(ctx) || b(ctx))
}

pub fn not(f: Filter) -> Filter {
    Arc::new(move |ctx: &Context| !f(ctx))
}

// =============================================================================
// Update Shape
// =============================================================================

/// Matches every update.
pub fn any_update() -> Filter {
    Arc::new(|_: &Context| true)
}

/// Matches plain (non-edited, non-channel) messages.
pub fn message() -> Filter {
    Arc::new(|ctx: &Context| ctx.update().message.is_some())
}

pub fn callback_query() -> Filter {
    Arc::new(|ctx: &Context| ctx.update().callback_query.is_some())
}

pub fn inline_query() -> Filter {
    Arc::new(|ctx: &Context| ctx.update().inline_query.is_some())
}

/// Matches changes of the bot's own membership in a chat.
pub fn my_chat_member() -> Filter {
    Arc::new(|ctx: &Context| ctx.update().my_chat_member.is_some())
}

pub fn chat_member() -> Filter {
    Arc::new(|ctx: &Context| ctx.update().chat_member.is_some())
}

pub fn pre_checkout_query() -> Filter {
    Arc::new(|ctx: &Context| ctx.update().pre_checkout_query.is_some())
}

pub fn purchased_paid_media() -> Filter {
    Arc::new(|ctx: &Context| ctx.update().purchased_paid_media.is_some())
}

// =============================================================================
// Text & Commands
// =============================================================================

/// Matches messages whose text starts with `/command`.
///
/// This is a prefix match, so `command("start")` also accepts `/start@bot`
/// and `/startgroup`.
pub fn command(command: impl Into<String>) -> Filter {
    let prefix = format!("/{}", command.into());
    Arc::new(move |ctx: &Context| message_text(ctx).is_some_and(|t| t.starts_with(&prefix)))
}

/// Matches `/command@bot_username`, for commands addressed to this bot in a
/// group. Never matches when the context has no bot.
pub fn command_with_at(command: impl Into<String>) -> Filter {
    let command = command.into();
    Arc::new(move |ctx: &Context| {
        let Some(bot) = ctx.bot() else {
            return false;
        };
        let Some(text) = message_text(ctx) else {
            return false;
        };
        let username = bot.username().unwrap_or_default();
        text.strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(command.as_str()))
            .and_then(|rest| rest.strip_prefix('@'))
            .is_some_and(|rest| rest.starts_with(username))
    })
}

pub fn text_prefix(prefix: impl Into<String>) -> Filter {
    let prefix = prefix.into();
    Arc::new(move |ctx: &Context| message_text(ctx).is_some_and(|t| t.starts_with(&prefix)))
}

pub fn text_contains(needle: impl Into<String>) -> Filter {
    let needle = needle.into();
    Arc::new(move |ctx: &Context| message_text(ctx).is_some_and(|t| t.contains(&needle)))
}

/// Matches callback queries whose data starts with `prefix`.
pub fn callback_prefix(prefix: impl Into<String>) -> Filter {
    let prefix = prefix.into();
    Arc::new(move |ctx: &Context| {
        ctx.update().callback_query.as_ref().is_some_and(|q| {
            q.data
                .as_deref()
                .unwrap_or_default()
                .starts_with(&prefix)
        })
    })
}

pub fn inline_query_prefix(prefix: impl Into<String>) -> Filter {
    let prefix = prefix.into();
    Arc::new(move |ctx: &Context| {
        ctx.update()
            .inline_query
            .as_ref()
            .is_some_and(|q| q.query.starts_with(&prefix))
    })
}

// =============================================================================
// Message Content
// =============================================================================

pub fn successful_payment() -> Filter {
    message_has(|m| m.successful_payment.is_some())
}

/// Matches messages forwarded from a channel.
pub fn forwarded_channel_message() -> Filter {
    message_has(|m| m.forward_origin.as_ref().is_some_and(|o| o.kind == "channel"))
}

pub fn photo() -> Filter {
    message_has(|m| !m.photo.is_empty())
}

pub fn video() -> Filter {
    message_has(|m| m.video.is_some())
}

pub fn video_note() -> Filter {
    message_has(|m| m.video_note.is_some())
}

pub fn animation() -> Filter {
    message_has(|m| m.animation.is_some())
}

pub fn voice() -> Filter {
    message_has(|m| m.voice.is_some())
}

pub fn audio() -> Filter {
    message_has(|m| m.audio.is_some())
}

pub fn document() -> Filter {
    message_has(|m| m.document.is_some())
}

pub fn sticker() -> Filter {
    message_has(|m| m.sticker.is_some())
}

pub fn chat_shared() -> Filter {
    message_has(|m| m.chat_shared.is_some())
}

pub fn users_shared() -> Filter {
    message_has(|m| m.users_shared.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pewter_core::model::{FileMeta, MessageOrigin, PhotoSize};
    use pewter_core::{CallbackQuery, InlineQuery, Update, User};

    fn text_ctx(text: &str) -> Context {
        Context::detached(Update::from_message(1, Message::text(10, text)))
    }

    fn message_ctx(message: Message) -> Context {
        Context::detached(Update::from_message(1, message))
    }

    #[test]
    fn command_is_a_prefix_match() {
        let start = command("start");
        assert!(start(&text_ctx("/start")));
        assert!(start(&text_ctx("/start payload")));
        assert!(start(&text_ctx("/startgroup")));
        assert!(!start(&text_ctx("start")));
        assert!(!start(&Context::detached(Update::default())));
    }

    #[test]
    fn command_with_at_requires_a_bot() {
        let f = command_with_at("help");
        assert!(!f(&text_ctx("/help@pewter_bot")));
    }

    #[test]
    fn text_filters() {
        assert!(text_prefix("hello")(&text_ctx("hello world")));
        assert!(!text_prefix("world")(&text_ctx("hello world")));
        assert!(text_contains("lo wo")(&text_ctx("hello world")));
        assert!(!text_contains("bye")(&text_ctx("hello world")));
    }

    #[test]
    fn callback_and_inline_prefixes() {
        let query = CallbackQuery {
            id: "q".into(),
            from: User::default(),
            data: Some("page:2".into()),
            ..Default::default()
        };
        let ctx = Context::detached(Update::from_callback_query(1, query));
        assert!(callback_query()(&ctx));
        assert!(callback_prefix("page:")(&ctx));
        assert!(!callback_prefix("item:")(&ctx));
        assert!(!message()(&ctx));

        let inline = Context::detached(Update {
            update_id: 2,
            inline_query: Some(InlineQuery {
                id: "i".into(),
                query: "cats funny".into(),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(inline_query()(&inline));
        assert!(inline_query_prefix("cats")(&inline));
        assert!(!inline_query_prefix("dogs")(&inline));
    }

    #[test]
    fn media_filters_look_at_message_content() {
        let with_photo = message_ctx(Message {
            photo: vec![PhotoSize {
                file_id: "p".into(),
                ..Default::default()
            }],
            ..Default::default()
        });
        assert!(photo()(&with_photo));
        assert!(!video()(&with_photo));

        let with_document = message_ctx(Message {
            document: Some(FileMeta {
                file_id: "d".into(),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert!(document()(&with_document));
        assert!(!sticker()(&with_document));
    }

    #[test]
    fn forwarded_channel_message_checks_origin_type() {
        let forwarded = |kind: &str| {
            message_ctx(Message {
                forward_origin: Some(MessageOrigin {
                    kind: kind.into(),
                    ..Default::default()
                }),
                ..Default::default()
            })
        };
        assert!(forwarded_channel_message()(&forwarded("channel")));
        assert!(!forwarded_channel_message()(&forwarded("user")));
    }

    #[test]
    fn combinators() {
        let ctx = text_ctx("/start");
        assert!(and(message(), command("start"))(&ctx));
        assert!(!and(message(), command("help"))(&ctx));
        assert!(or(command("help"), command("start"))(&ctx));
        assert!(not(callback_query())(&ctx));
        assert!(any_update()(&Context::detached(Update::default())));
    }
}
