//! Bot construction from configuration.

use std::sync::Arc;

use pewter_core::Bot;
use pewter_transport::HttpBotClient;
use tracing::info;

use crate::config::{BotSettings, ConfigError};
use crate::error::RuntimeResult;

/// Builds an HTTP-backed bot from `settings` without contacting the API.
pub fn build_bot(settings: &BotSettings) -> RuntimeResult<Bot> {
    if settings.token.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.token").into());
    }
    let client = HttpBotClient::new(settings.to_client_config())?;
    Ok(Bot::new(settings.token.clone(), Arc::new(client)))
}

/// Builds a bot and verifies its token with `getMe`.
pub async fn connect_bot(settings: &BotSettings) -> RuntimeResult<Bot> {
    let bot = build_bot(settings)?.verify().await?;
    info!(
        username = bot.username().unwrap_or_default(),
        api_url = %settings.api_url,
        "Bot connected"
    );
    Ok(bot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;

    #[test]
    fn missing_token_is_a_config_error() {
        let err = build_bot(&BotSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Config(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn bot_uses_configured_endpoint() {
        let settings = BotSettings {
            token: "123:abc".into(),
            api_url: "http://localhost:8081/".into(),
            test_environment: true,
            ..Default::default()
        };
        let bot = build_bot(&settings).unwrap();
        assert_eq!(bot.token(), "123:abc");
        assert_eq!(
            bot.file_url("docs/a.pdf", None),
            "http://localhost:8081/file/bot123:abc/test/docs/a.pdf"
        );
    }
}
