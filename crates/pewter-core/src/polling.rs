//! Long-polling update source.
//!
//! [`UpdateStream::spawn`] runs a fetch loop on its own task and hands back
//! the receiving half of a bounded queue. The loop owns a [`PollCursor`],
//! so updates come out in increasing `update_id` order with duplicates
//! dropped. Fetch failures are retried after a fixed delay; only
//! cancellation (or dropping the receiver) ends the stream.
//!
//! # Example
//!
//! ```rust,ignore
//! let cancel = CancellationToken::new();
//! let mut updates = UpdateStream::spawn(bot.clone(), PollingOptions::default(), cancel.clone());
//! while let Some(update) = updates.recv().await {
//!     router.handle_update(update, cancel.child_token()).await?;
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::bot::GetUpdatesOptions;
use crate::client::UpdateFetcher;
use crate::error::ApiError;
use crate::model::Update;

/// Queue capacity used when none (or zero) is configured.
pub const DEFAULT_BUFFER: usize = 100;

/// Callback invoked with every non-cancellation fetch failure.
pub type ErrorObserver = Arc<dyn Fn(&ApiError) + Send + Sync>;

// =============================================================================
// Poll Cursor
// =============================================================================

/// The next expected update identifier.
///
/// The cursor never decreases. An update is accepted only if its identifier
/// is at least the current offset, and accepting it moves the offset past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollCursor {
    offset: i64,
}

impl PollCursor {
    pub fn new(offset: i64) -> Self {
        Self { offset }
    }

    /// The offset to send with the next fetch.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Advances past `update_id`, or returns `false` if it was already seen.
    ///
    /// The offset saturates at `i64::MAX`.
    pub fn accept(&mut self, update_id: i64) -> bool {
        if update_id < self.offset {
            return false;
        }
        self.offset = update_id.saturating_add(1);
        true
    }
}

// =============================================================================
// Options
// =============================================================================

/// Configuration of the polling loop.
#[derive(Clone)]
pub struct PollingOptions {
    /// Capacity of the output queue. Zero means [`DEFAULT_BUFFER`].
    pub buffer: usize,
    /// Parameters of each `getUpdates` call; `offset` is the starting cursor.
    pub get_updates: GetUpdatesOptions,
    /// Timeout of a single fetch request. Keep it above the long-poll timeout.
    pub request_timeout: Duration,
    /// Fixed delay between a failed fetch and the next attempt.
    pub retry_delay: Duration,
    /// Optional observer of fetch failures.
    pub error_handler: Option<ErrorObserver>,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_BUFFER,
            get_updates: GetUpdatesOptions::default(),
            request_timeout: Duration::from_secs(605),
            retry_delay: Duration::from_secs(3),
            error_handler: None,
        }
    }
}

impl std::fmt::Debug for PollingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingOptions")
            .field("buffer", &self.buffer)
            .field("get_updates", &self.get_updates)
            .field("request_timeout", &self.request_timeout)
            .field("retry_delay", &self.retry_delay)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl PollingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.get_updates.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.get_updates.limit = Some(limit);
        self
    }

    /// Sets the long-poll timeout in seconds.
    pub fn with_timeout(mut self, seconds: i64) -> Self {
        self.get_updates.timeout = seconds;
        self
    }

    pub fn with_allowed_updates<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.get_updates.allowed_updates = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the fetch failure observer.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(f));
        self
    }

    /// The queue capacity actually used.
    pub fn effective_buffer(&self) -> usize {
        if self.buffer == 0 {
            DEFAULT_BUFFER
        } else {
            self.buffer
        }
    }
}

// =============================================================================
// Update Stream
// =============================================================================

/// Entry point of the polling update source.
pub struct UpdateStream;

impl UpdateStream {
    /// Starts a fetch loop and returns its output queue.
    ///
    /// Every call starts a fresh loop from `options.get_updates.offset`.
    /// The queue closes when `cancel` fires or a fetch reports
    /// [`ApiError::Canceled`].
    pub fn spawn<F>(
        fetcher: F,
        options: PollingOptions,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<Update>
    where
        F: UpdateFetcher + 'static,
    {
        let (tx, rx) = mpsc::channel(options.effective_buffer());
        tokio::spawn(poll_loop(fetcher, options, tx, cancel));
        rx
    }
}

async fn poll_loop<F: UpdateFetcher>(
    fetcher: F,
    options: PollingOptions,
    tx: mpsc::Sender<Update>,
    cancel: CancellationToken,
) {
    let mut params = options.get_updates.clone();
    let mut cursor = PollCursor::new(params.offset);
    debug!(offset = cursor.offset(), "Update polling started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        params.offset = cursor.offset();
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = fetcher.fetch_updates(&params, Some(options.request_timeout)) => result,
        };

        let updates = match fetched {
            Ok(updates) => updates,
            Err(ApiError::Canceled) => break,
            Err(e) => {
                warn!(
                    error = %e,
                    retry_in = ?options.retry_delay,
                    "Failed to fetch updates"
                );
                if let Some(observer) = &options.error_handler {
                    observer(&e);
                }
                let retry = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => false,
                    _ = tokio::time::sleep(options.retry_delay) => true,
                };
                if !retry {
                    break;
                }
                continue;
            }
        };

        trace!(count = updates.len(), offset = cursor.offset(), "Fetched updates");
        for update in updates {
            if !cursor.accept(update.update_id) {
                trace!(update_id = update.update_id, "Skipping already delivered update");
                continue;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(offset = cursor.offset(), "Update polling canceled");
                    return;
                }
                sent = tx.send(update) => {
                    if sent.is_err() {
                        debug!("Update receiver dropped, stopping polling");
                        return;
                    }
                }
            }
        }
    }

    debug!(offset = cursor.offset(), "Update polling canceled");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiResult;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a script of responses, then either cancels or hangs.
    struct ScriptedFetcher {
        script: Mutex<VecDeque<ApiResult<Vec<Update>>>>,
        offsets: Arc<Mutex<Vec<i64>>>,
        hang_when_done: bool,
    }

    impl ScriptedFetcher {
        fn new(script: Vec<ApiResult<Vec<Update>>>, hang_when_done: bool) -> Self {
            Self {
                script: Mutex::new(script.into()),
                offsets: Arc::new(Mutex::new(Vec::new())),
                hang_when_done,
            }
        }
    }

    #[async_trait]
    impl UpdateFetcher for ScriptedFetcher {
        async fn fetch_updates(
            &self,
            params: &GetUpdatesOptions,
            _request_timeout: Option<Duration>,
        ) -> ApiResult<Vec<Update>> {
            self.offsets.lock().push(params.offset);
            let next = self.script.lock().pop_front();
            match next {
                Some(result) => result,
                None if self.hang_when_done => std::future::pending().await,
                None => Err(ApiError::Canceled),
            }
        }
    }

    fn batch(ids: &[i64]) -> ApiResult<Vec<Update>> {
        Ok(ids
            .iter()
            .map(|&update_id| Update {
                update_id,
                ..Default::default()
            })
            .collect())
    }

    async fn drain(rx: &mut mpsc::Receiver<Update>) -> Vec<i64> {
        let mut ids = Vec::new();
        while let Some(update) = rx.recv().await {
            ids.push(update.update_id);
        }
        ids
    }

    #[test]
    fn cursor_skips_already_seen_ids() {
        let mut cursor = PollCursor::new(5);
        assert!(!cursor.accept(4));
        assert_eq!(cursor.offset(), 5);
        assert!(cursor.accept(5));
        assert!(cursor.accept(9));
        assert_eq!(cursor.offset(), 10);
        assert!(!cursor.accept(7));
        assert_eq!(cursor.offset(), 10);
    }

    #[test]
    fn cursor_saturates_at_max_id() {
        let mut cursor = PollCursor::new(i64::MAX - 1);
        assert!(cursor.accept(i64::MAX - 1));
        assert_eq!(cursor.offset(), i64::MAX);
        assert!(cursor.accept(i64::MAX));
        assert_eq!(cursor.offset(), i64::MAX);
        assert!(!cursor.accept(i64::MAX - 1));
    }

    #[test]
    fn zero_buffer_falls_back_to_default() {
        assert_eq!(PollingOptions::new().with_buffer(0).effective_buffer(), 100);
        assert_eq!(PollingOptions::new().with_buffer(3).effective_buffer(), 3);
        let defaults = PollingOptions::default();
        assert_eq!(defaults.get_updates.timeout, 600);
        assert_eq!(defaults.request_timeout, Duration::from_secs(605));
    }

    #[tokio::test]
    async fn offsets_advance_and_duplicates_are_dropped() {
        let fetcher = ScriptedFetcher::new(vec![batch(&[1, 2, 3]), batch(&[3, 2, 4])], false);
        let offsets = fetcher.offsets.clone();

        let mut rx = UpdateStream::spawn(fetcher, PollingOptions::default(), CancellationToken::new());

        assert_eq!(drain(&mut rx).await, vec![1, 2, 3, 4]);
        assert_eq!(*offsets.lock(), vec![0, 4, 5]);
    }

    #[tokio::test]
    async fn starts_from_configured_offset() {
        let fetcher = ScriptedFetcher::new(vec![batch(&[8, 10, 11])], false);
        let offsets = fetcher.offsets.clone();

        let options = PollingOptions::new().with_offset(10);
        let mut rx = UpdateStream::spawn(fetcher, options, CancellationToken::new());

        assert_eq!(drain(&mut rx).await, vec![10, 11]);
        assert_eq!(*offsets.lock(), vec![10, 12]);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_observed_and_retried() {
        let fetcher = ScriptedFetcher::new(
            vec![
                Err(ApiError::Timeout),
                Err(ApiError::Http {
                    method: "getUpdates".into(),
                    reason: "connection reset".into(),
                }),
                batch(&[1]),
            ],
            false,
        );
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        let options = PollingOptions::new()
            .with_retry_delay(Duration::from_secs(3))
            .on_error(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let started = tokio::time::Instant::now();
        let mut rx = UpdateStream::spawn(fetcher, options, CancellationToken::new());

        assert_eq!(drain(&mut rx).await, vec![1]);
        // The trailing cancellation is not a failure.
        assert_eq!(failures.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test]
    async fn cancel_unblocks_a_full_queue() {
        let fetcher = ScriptedFetcher::new(vec![batch(&[1, 2, 3])], true);
        let cancel = CancellationToken::new();
        let mut rx = UpdateStream::spawn(fetcher, PollingOptions::new().with_buffer(1), cancel.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let ids = tokio::time::timeout(Duration::from_secs(1), drain(&mut rx))
            .await
            .expect("stream should close after cancellation");
        assert!(ids.len() <= 1);
    }

    #[tokio::test]
    async fn cancel_interrupts_a_pending_fetch() {
        let fetcher = ScriptedFetcher::new(vec![], true);
        let offsets = fetcher.offsets.clone();
        let cancel = CancellationToken::new();
        let mut rx = UpdateStream::spawn(fetcher, PollingOptions::default(), cancel.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let ids = tokio::time::timeout(Duration::from_secs(1), drain(&mut rx))
            .await
            .expect("stream should close after cancellation");
        assert!(ids.is_empty());
        assert_eq!(offsets.lock().len(), 1);
    }
}
