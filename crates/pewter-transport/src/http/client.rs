//! reqwest implementation of [`BotClient`].

use std::time::Duration;

use async_trait::async_trait;
use pewter_core::model::ResponseParameters;
use pewter_core::{ApiError, ApiResult, BotClient, RequestOptions};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Public bot API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Timeout applied to requests that do not set their own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const REDACTED: &str = "<TOKEN>";

/// Settings of an [`HttpBotClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL of the API server, without a trailing slash.
    pub api_url: String,
    /// Use the test environment paths (`/bot<token>/test/...`).
    pub test_environment: bool,
    /// Default request timeout.
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            test_environment: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_test_environment(mut self, enabled: bool) -> Self {
        self.test_environment = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP bot client.
///
/// Every call is a JSON `POST` to `{api_url}/bot{token}/{method}`. The
/// response envelope is decoded here: `ok: false` becomes
/// [`ApiError::Remote`], and transport failures never mention the token.
#[derive(Debug, Clone)]
pub struct HttpBotClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpBotClient {
    /// Creates a client with its own connection pool.
    pub fn new(config: HttpClientConfig) -> ApiResult<Self> {
        let client = ClientBuilder::new()
            .build()
            .map_err(|e| ApiError::Http {
                method: "init".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a client around an existing reqwest client.
    pub fn with_client(client: Client, config: HttpClientConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn env_auth(&self, token: &str) -> String {
        if self.config.test_environment {
            format!("bot{token}/test")
        } else {
            format!("bot{token}")
        }
    }

    fn method_url(&self, token: &str, method: &str, opts: Option<&RequestOptions>) -> String {
        format!("{}/{}/{}", self.api_url(opts), self.env_auth(token), method)
    }
}

#[async_trait]
impl BotClient for HttpBotClient {
    async fn request(
        &self,
        token: &str,
        method: &str,
        mut params: Map<String, Value>,
        opts: Option<&RequestOptions>,
    ) -> ApiResult<Value> {
        if let Some(opts) = opts {
            for (key, value) in &opts.override_params {
                params.insert(key.clone(), value.clone());
            }
        }

        let timeout = opts
            .and_then(|o| o.timeout)
            .unwrap_or(self.config.timeout);
        trace!(method, timeout_ms = timeout.as_millis() as u64, "Calling bot API");

        let response = self
            .client
            .post(self.method_url(token, method, opts))
            .timeout(timeout)
            .json(&params)
            .send()
            .await
            .map_err(|e| transport_error(method, token, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(method, token, e))?;

        debug!(method, status = status.as_u16(), len = body.len(), "Bot API responded");
        decode_envelope(method, &body)
    }

    fn api_url(&self, opts: Option<&RequestOptions>) -> String {
        let url = opts
            .and_then(|o| o.api_url.as_deref())
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.config.api_url);
        url.trim_end_matches('/').to_string()
    }

    fn file_url(&self, token: &str, path: &str, opts: Option<&RequestOptions>) -> String {
        format!("{}/file/{}/{}", self.api_url(opts), self.env_auth(token), path)
    }
}

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

fn decode_envelope(method: &str, body: &[u8]) -> ApiResult<Value> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| ApiError::Decode(format!("response to {method}: {e}")))?;

    if !envelope.ok {
        let parameters = envelope.parameters.unwrap_or_default();
        return Err(ApiError::Remote {
            method: method.to_string(),
            code: envelope.error_code,
            description: envelope.description,
            retry_after: parameters.retry_after,
            migrate_to_chat_id: parameters.migrate_to_chat_id,
        });
    }

    Ok(envelope.result.unwrap_or(Value::Null))
}

fn transport_error(method: &str, token: &str, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::Timeout;
    }
    ApiError::Http {
        method: method.to_string(),
        reason: redact(&err.to_string(), token),
    }
}

fn redact(text: &str, token: &str) -> String {
    if token.is_empty() {
        text.to_string()
    } else {
        text.replace(token, REDACTED)
    }
}
