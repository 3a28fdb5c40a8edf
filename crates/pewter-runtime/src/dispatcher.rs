//! Polling dispatcher: a fixed worker pool fed by the long-polling update source.
//!
//! ```text
//!                 ┌──────────┐
//!                 │ worker 0 │──▶ handler.handle_update
//! UpdateStream ──▶│ worker 1 │──▶ handler.handle_update
//!  (one queue)    │   ...    │
//!                 │ worker N │──▶ handler.handle_update
//!                 └──────────┘
//! ```
//!
//! Each worker takes one update at a time and runs it to completion, so a
//! pool of one keeps updates strictly ordered. With more workers, updates
//! taken by different workers may finish in any order.
//!
//! # Shutdown
//!
//! [`Dispatcher::stop`] cancels the polling loop and the idle workers, then
//! waits for in-flight updates up to the given timeout. Handlers get a
//! separate token that only fires once that timeout has passed, so a
//! handler that watches it can give up and free its worker.
//!
//! # Example
//!
//! ```rust,ignore
//! let bot = Bot::new(token, client).verify().await?;
//! let router = Router::builder().bot(bot.clone()).build();
//! router.on_command("start", handlers![start]);
//!
//! let dispatcher = Dispatcher::new(bot, router);
//! dispatcher.start_polling(16, PollingOptions::default())?;
//! // ...
//! dispatcher.stop(Duration::from_secs(5)).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pewter_core::{PollingOptions, Update, UpdateFetcher, UpdateHandler, UpdateStream};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::config::PewterConfig;
use crate::error::{DispatcherError, DispatcherResult};

/// Workers used by [`Dispatcher::start`] unless configured otherwise.
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Shutdown timeout used by [`Dispatcher::run`] unless configured otherwise.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Update>>>;

/// One active polling session.
struct Session {
    /// Stops polling and idle workers.
    cancel: CancellationToken,
    /// Parent of every per-update token; fired when shutdown times out.
    handler_cancel: CancellationToken,
    workers: TaskTracker,
}

/// Drives an [`UpdateHandler`] with updates from an [`UpdateFetcher`].
pub struct Dispatcher {
    fetcher: Arc<dyn UpdateFetcher>,
    handler: Arc<dyn UpdateHandler>,
    session: Mutex<Option<Session>>,
    pool_size: usize,
    polling: PollingOptions,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("running", &self.is_running())
            .field("pool_size", &self.pool_size)
            .field("polling", &self.polling)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Dispatcher {
    pub fn new<F, H>(fetcher: F, handler: H) -> Self
    where
        F: UpdateFetcher + 'static,
        H: UpdateHandler + 'static,
    {
        Self {
            fetcher: Arc::new(fetcher),
            handler: Arc::new(handler),
            session: Mutex::new(None),
            pool_size: DEFAULT_POOL_SIZE,
            polling: PollingOptions::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Creates a dispatcher whose defaults come from `config`.
    pub fn from_config<F, H>(fetcher: F, handler: H, config: &PewterConfig) -> Self
    where
        F: UpdateFetcher + 'static,
        H: UpdateHandler + 'static,
    {
        Self::new(fetcher, handler)
            .with_pool_size(config.polling.pool_size)
            .with_polling_options(config.polling.to_options())
            .with_shutdown_timeout(config.dispatcher.shutdown_timeout())
    }

    /// Worker count used by [`start`](Self::start).
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Polling options used by [`start`](Self::start).
    pub fn with_polling_options(mut self, options: PollingOptions) -> Self {
        self.polling = options;
        self
    }

    /// Grace period used by [`run`](Self::run) and [`run_until`](Self::run_until).
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Starts polling with the configured pool size and options.
    pub fn start(&self) -> DispatcherResult<()> {
        self.start_polling(self.pool_size, self.polling.clone())
    }

    /// Starts the update source and `pool_size` workers.
    ///
    /// A pool size of zero is treated as one. Fails if a session is already
    /// running.
    pub fn start_polling(&self, pool_size: usize, options: PollingOptions) -> DispatcherResult<()> {
        // Held until the session is stored so a concurrent stop sees either
        // no session or a complete one.
        let mut session = self.session.lock();
        if session.is_some() {
            return Err(DispatcherError::AlreadyStarted);
        }

        let pool_size = pool_size.max(1);
        let cancel = CancellationToken::new();
        let handler_cancel = CancellationToken::new();
        let workers = TaskTracker::new();

        let updates = UpdateStream::spawn(Arc::clone(&self.fetcher), options, cancel.clone());
        let updates: SharedReceiver = Arc::new(tokio::sync::Mutex::new(updates));

        for worker in 0..pool_size {
            workers.spawn(worker_loop(
                worker,
                Arc::clone(&updates),
                Arc::clone(&self.handler),
                cancel.clone(),
                handler_cancel.clone(),
            ));
        }
        workers.close();

        *session = Some(Session {
            cancel,
            handler_cancel,
            workers,
        });

        info!(pool_size, "Dispatcher started polling");
        Ok(())
    }

    /// Stops polling and waits up to `timeout` for in-flight updates.
    ///
    /// On timeout the handler token is cancelled and
    /// [`DispatcherError::DeadlineExceeded`] is returned; workers that are
    /// still busy are not aborted.
    pub async fn stop(&self, timeout: Duration) -> DispatcherResult<()> {
        let taken = self.session.lock().take();
        let Some(session) = taken else {
            return Err(DispatcherError::NotStarted);
        };

        debug!(timeout_ms = timeout.as_millis() as u64, "Stopping dispatcher");
        session.cancel.cancel();

        match tokio::time::timeout(timeout, session.workers.wait()).await {
            Ok(()) => {
                info!("Dispatcher stopped");
                Ok(())
            }
            Err(_) => {
                session.handler_cancel.cancel();
                warn!(
                    busy_workers = session.workers.len(),
                    "Dispatcher shutdown deadline exceeded"
                );
                Err(DispatcherError::DeadlineExceeded(timeout))
            }
        }
    }

    /// Starts polling, waits for `shutdown`, then stops.
    pub async fn run_until<S>(&self, shutdown: S) -> DispatcherResult<()>
    where
        S: Future<Output = ()>,
    {
        self.start()?;
        shutdown.await;
        self.stop(self.shutdown_timeout).await
    }

    /// Starts polling and runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> DispatcherResult<()> {
        info!("Dispatcher running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }
}

async fn worker_loop(
    worker: usize,
    updates: SharedReceiver,
    handler: Arc<dyn UpdateHandler>,
    cancel: CancellationToken,
    handler_cancel: CancellationToken,
) {
    trace!(worker, "Worker started");
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            update = async { updates.lock().await.recv().await } => update,
        };
        let Some(update) = next else {
            break;
        };

        let update_id = update.update_id;
        // Dispatch errors belong to the handler's own error handling.
        if let Err(e) = handler
            .handle_update(update, handler_cancel.child_token())
            .await
        {
            debug!(worker, update_id, error = %e, "Update handler returned an error");
        }
    }
    trace!(worker, "Worker stopped");
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal as unix_signal};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = signal::ctrl_c() => log_ctrl_c(result),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                log_ctrl_c(signal::ctrl_c().await);
            }
        }
    }

    #[cfg(not(unix))]
    log_ctrl_c(signal::ctrl_c().await);
}

fn log_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}
