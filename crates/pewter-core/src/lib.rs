//! # Pewter Core
//!
//! Update acquisition for the Pewter bot framework.
//!
//! This crate holds everything the router and dispatcher need that is not
//! routing itself:
//!
//! - **Model**: typed updates and the payloads filters inspect ([`Update`], [`Message`])
//! - **Errors**: the API error taxonomy ([`ApiError`]) and the handler error type ([`BoxError`])
//! - **Collaborators**: transport traits ([`BotClient`], [`UpdateFetcher`], [`UpdateHandler`])
//! - **Bot**: an authenticated API handle with the outbound methods ([`Bot`])
//! - **Polling**: the long-polling update source ([`UpdateStream`], [`PollCursor`])
//!
//! ## Data Flow
//!
//! ```text
//! ┌───────────────┐     ┌──────────────┐     ┌────────────────┐
//! │ UpdateFetcher │────▶│ UpdateStream │────▶│ mpsc::Receiver │────▶ workers
//! │   (getUpdates)│     │ (PollCursor) │     │   <Update>     │
//! └───────────────┘     └──────────────┘     └────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use pewter_core::{Bot, PollingOptions, UpdateStream};
//! use tokio_util::sync::CancellationToken;
//!
//! let bot = Bot::new(token, client).verify().await?;
//! let cancel = CancellationToken::new();
//! let mut updates = UpdateStream::spawn(bot, PollingOptions::default(), cancel.clone());
//!
//! while let Some(update) = updates.recv().await {
//!     println!("update {} ({:?})", update.update_id, update.kind());
//! }
//! ```

pub mod bot;
pub mod client;
pub mod error;
pub mod model;
pub mod polling;

pub use bot::{
    AnswerCallbackQueryOptions, Bot, DeleteMessageOptions, EditMessageTextOptions,
    GetUpdatesOptions, SendMessageOptions, SetMessageReactionOptions, SetWebhookOptions,
};
pub use client::{BotClient, BoxedBotClient, RequestOptions, UpdateFetcher, UpdateHandler};
pub use error::{ApiError, ApiResult, BoxError};
pub use model::{
    CallbackQuery, Chat, InlineQuery, MaybeInaccessibleMessage, Message, ParseMode, ReactionType,
    Update, UpdateKind, User,
};
pub use polling::{DEFAULT_BUFFER, ErrorObserver, PollCursor, PollingOptions, UpdateStream};

// Re-exported so downstream crates agree on the token type.
pub use tokio_util::sync::CancellationToken;
