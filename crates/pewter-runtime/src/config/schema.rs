//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use pewter_core::PollingOptions;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PewterConfig {
    /// Bot credentials and API endpoint.
    #[serde(default)]
    pub bot: BotSettings,

    /// Long-polling update source and worker pool.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Dispatcher lifecycle settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Bot credentials and API endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotSettings {
    /// Bot token issued by the API provider.
    #[serde(default)]
    pub token: String,

    /// Base URL of the bot API server.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Use the test environment API paths.
    #[serde(default)]
    pub test_environment: bool,

    /// Default timeout of a single API request in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            test_environment: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for BotSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotSettings")
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("api_url", &self.api_url)
            .field("test_environment", &self.test_environment)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl BotSettings {
    /// Converts to the HTTP client settings.
    #[cfg(feature = "http-client")]
    pub fn to_client_config(&self) -> pewter_transport::HttpClientConfig {
        pewter_transport::HttpClientConfig::new()
            .with_api_url(self.api_url.clone())
            .with_test_environment(self.test_environment)
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_request_timeout_secs() -> u64 {
    5
}

// =============================================================================
// Polling
// =============================================================================

/// Long-polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Number of concurrent dispatch workers.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Capacity of the update queue.
    #[serde(default = "default_buffer")]
    pub buffer: usize,

    /// Long-poll timeout in seconds sent with every fetch.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: i64,

    /// Maximum updates per fetch; 0 leaves it to the server.
    #[serde(default)]
    pub limit: i64,

    /// Starting offset.
    #[serde(default)]
    pub offset: i64,

    /// Update kinds to receive; empty keeps the server's selection.
    #[serde(default)]
    pub allowed_updates: Vec<String>,

    /// Delay after a failed fetch in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Timeout of a single fetch request in seconds.
    #[serde(default = "default_poll_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            buffer: default_buffer(),
            timeout_secs: default_timeout_secs(),
            limit: 0,
            offset: 0,
            allowed_updates: Vec::new(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_poll_request_timeout_secs(),
        }
    }
}

impl PollingConfig {
    /// Converts to the polling loop options.
    pub fn to_options(&self) -> PollingOptions {
        let mut options = PollingOptions::new()
            .with_buffer(self.buffer)
            .with_offset(self.offset)
            .with_timeout(self.timeout_secs)
            .with_allowed_updates(self.allowed_updates.iter().cloned())
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs));
        if self.limit > 0 {
            options = options.with_limit(self.limit);
        }
        options
    }
}

fn default_pool_size() -> usize {
    16
}

fn default_buffer() -> usize {
    pewter_core::DEFAULT_BUFFER
}

fn default_timeout_secs() -> i64 {
    600
}

fn default_retry_delay_ms() -> u64 {
    3000
}

fn default_poll_request_timeout_secs() -> u64 {
    605
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Dispatcher lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// How long `stop` waits for in-flight updates, in seconds.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl DispatcherConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` otherwise.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Rotation of the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread IDs in log lines.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of the log call.
    #[serde(default)]
    pub file_location: bool,

    /// Log file, used when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-module levels, e.g. `pewter_core = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::Never,
            filters: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_polling_defaults() {
        let config = PewterConfig::default();
        assert_eq!(config.polling.pool_size, 16);
        assert_eq!(config.bot.api_url, "https://api.telegram.org");
        assert_eq!(config.dispatcher.shutdown_timeout(), Duration::from_secs(5));

        let options = config.polling.to_options();
        assert_eq!(options.buffer, 100);
        assert_eq!(options.get_updates.timeout, 600);
        assert_eq!(options.get_updates.limit, None);
        assert_eq!(options.retry_delay, Duration::from_secs(3));
        assert_eq!(options.request_timeout, Duration::from_secs(605));
    }

    #[test]
    fn polling_config_converts_limits_and_kinds() {
        let config = PollingConfig {
            limit: 50,
            offset: 10,
            allowed_updates: vec!["message".into(), "callback_query".into()],
            ..Default::default()
        };
        let options = config.to_options();
        assert_eq!(options.get_updates.limit, Some(50));
        assert_eq!(options.get_updates.offset, 10);
        assert_eq!(
            options.get_updates.allowed_updates,
            vec!["message".to_string(), "callback_query".to_string()]
        );
    }

    #[test]
    fn bot_settings_debug_hides_token() {
        let settings = BotSettings {
            token: "123:secret".into(),
            ..Default::default()
        };
        let text = format!("{settings:?}");
        assert!(!text.contains("secret"));
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config: PewterConfig =
            serde_json::from_str(r#"{"polling":{"pool_size":4},"logging":{"level":"debug"}}"#)
                .unwrap();
        assert_eq!(config.polling.pool_size, 4);
        assert_eq!(config.polling.buffer, 100);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }
}
