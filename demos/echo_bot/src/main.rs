//! Echo bot with a small admin state machine.
//!
//! ```text
//! PEWTER_BOT__TOKEN=123:abc cargo run -p echo-bot
//! cargo run -p echo-bot -- --config ./pewter.toml --pool-size 4
//! ```
//!
//! Commands: `/start`, `/task`, `/react`, `/fatal`, `/admin`. Inside the admin
//! state `/ban` and `/exit` are available and everything else is answered
//! with the admin menu.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use parking_lot::Mutex;
use pewter::prelude::*;
use pewter::runtime::config::validate_for_polling;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "echo-bot", about = "Echo bot built on Pewter")]
struct Args {
    /// Configuration file; searched for in the usual places when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bot token, overriding the configured one.
    #[arg(short, long, env = "ECHO_BOT_TOKEN")]
    token: Option<String>,

    /// Number of concurrent workers.
    #[arg(long)]
    pool_size: Option<usize>,
}

/// Per-user conversation state, keyed by user id.
#[derive(Clone, Default)]
struct StateStore {
    states: Arc<Mutex<HashMap<i64, String>>>,
}

impl StateStore {
    fn get(&self, user_id: i64) -> Option<String> {
        self.states.lock().get(&user_id).cloned()
    }

    fn set(&self, user_id: i64, state: Option<String>) {
        let mut states = self.states.lock();
        match state {
            Some(state) => states.insert(user_id, state),
            None => states.remove(&user_id),
        };
    }

    /// Loads the sender's state into the context and saves whatever the
    /// chain leaves behind.
    fn middleware(&self) -> BoxedHandler {
        let store = self.clone();
        handler(move |ctx: Context| {
            let store = store.clone();
            async move {
                let Some(user_id) = ctx.sender().map(|u| u.id) else {
                    return ctx.next().await;
                };
                if let Some(state) = store.get(user_id) {
                    ctx.set_state(state);
                }
                let result = ctx.next().await;
                store.set(user_id, ctx.state());
                result
            }
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let mut config = loader.load().context("loading configuration")?;
    if let Some(token) = args.token {
        config.bot.token = token;
    }
    if let Some(pool_size) = args.pool_size {
        config.polling.pool_size = pool_size;
    }

    logging::init_from_config(&config.logging);
    validate_for_polling(&config).context("invalid configuration")?;

    let bot = connect_bot(&config.bot).await.context("connecting bot")?;
    let router = build_router(bot.clone(), StateStore::default());

    info!(pool_size = config.polling.pool_size, "Echo bot running");
    Dispatcher::from_config(bot, router, &config).run().await?;
    info!("Echo bot stopped");
    Ok(())
}

fn build_router(bot: Bot, store: StateStore) -> Router {
    let router = Router::builder()
        .bot(bot)
        .cancel_handler(middleware::cancel_guard())
        .error_handler(|ctx: Context, err: BoxError| async move {
            if matches!(
                RouterError::from_boxed(&err),
                Some(RouterError::RouteNotFound)
            ) {
                return;
            }
            warn!(update_id = ctx.update().update_id, error = %err, "Update failed");
        })
        .build();

    router.use_middleware([middleware::recovery(), store.middleware()]);

    router.on_start(handlers![start]).name("start");
    router.on_command("task", handlers![long_task]);
    router.on_command("react", handlers![react]);
    router.on_command("fatal", handlers![fatal]);
    router.on_command("admin", handlers![enter_admin]);

    let admin = router.use_state("admin", handlers![log_admin]);
    admin.on_command("ban", handlers![ban]);
    admin.on_command("exit", handlers![exit_admin]);
    admin.on_message(handlers![admin_menu]);

    router.on_message(handlers![echo]);
    router
}

async fn start(ctx: Context) -> HandlerResult {
    ctx.reply(
        "Commands:\n\
         /task - run a long task\n\
         /react - react to your message\n\
         /fatal - panic inside a handler\n\
         /admin - open the admin menu",
    )
    .await?;
    Ok(())
}

async fn long_task(ctx: Context) -> HandlerResult {
    ctx.reply("Task started").await?;
    for step in 1..=10 {
        if ctx.is_canceled() {
            info!(step, "Task canceled");
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    ctx.reply("Task done").await?;
    Ok(())
}

async fn react(ctx: Context) -> HandlerResult {
    ctx.react(&["👍"]).await?;
    Ok(())
}

async fn fatal(_ctx: Context) -> HandlerResult {
    panic!("fatal command");
}

async fn enter_admin(ctx: Context) -> HandlerResult {
    ctx.set_state("admin");
    admin_menu(ctx).await
}

async fn log_admin(ctx: Context) -> HandlerResult {
    info!(
        user_id = ctx.sender().map(|u| u.id),
        text = ctx.message().and_then(|m| m.text.as_deref()),
        "Admin command"
    );
    ctx.next().await
}

async fn admin_menu(ctx: Context) -> HandlerResult {
    ctx.reply("Admin menu:\n/ban <user id>\n/exit").await?;
    Ok(())
}

async fn ban(ctx: Context) -> HandlerResult {
    let reply = match ctx.command_args().first() {
        Some(id) => format!("User {id} banned"),
        None => "Usage: /ban <user id>".to_string(),
    };
    ctx.reply(&reply).await?;
    Ok(())
}

async fn exit_admin(ctx: Context) -> HandlerResult {
    ctx.clear_state();
    ctx.reply("Left the admin menu").await?;
    Ok(())
}

async fn echo(ctx: Context) -> HandlerResult {
    let text = ctx
        .message()
        .and_then(|m| m.text_or_caption())
        .map(str::to_owned);
    match text {
        Some(text) => ctx.reply(&text).await?,
        None => ctx.reply("Undefined command!").await?,
    };
    Ok(())
}
