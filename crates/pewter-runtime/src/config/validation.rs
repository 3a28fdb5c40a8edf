//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotSettings, PewterConfig, PollingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &PewterConfig) -> ConfigResult<()> {
    validate_bot_settings(&config.bot)?;
    validate_polling_config(&config.polling)?;
    Ok(())
}

/// Like [`validate_config`], and also requires a bot token.
pub fn validate_for_polling(config: &PewterConfig) -> ConfigResult<()> {
    if config.bot.token.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.token"));
    }
    validate_config(config)
}

fn validate_bot_settings(bot: &BotSettings) -> ConfigResult<()> {
    validate_url(&bot.api_url)?;

    if bot.request_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Request timeout must be greater than 0",
        ));
    }

    if bot.token.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation("Bot token cannot contain whitespace"));
    }

    Ok(())
}

fn validate_polling_config(polling: &PollingConfig) -> ConfigResult<()> {
    if polling.pool_size == 0 {
        return Err(ConfigError::validation("Pool size must be greater than 0"));
    }

    if polling.buffer == 0 {
        return Err(ConfigError::validation("Buffer must be greater than 0"));
    }

    if polling.timeout_secs < 0 {
        return Err(ConfigError::validation("Long-poll timeout cannot be negative"));
    }

    if polling.request_timeout_secs <= polling.timeout_secs as u64 {
        return Err(ConfigError::validation(format!(
            "Polling request timeout ({}s) must be longer than the long-poll timeout ({}s)",
            polling.request_timeout_secs, polling.timeout_secs
        )));
    }

    if polling.limit < 0 || polling.limit > 100 {
        return Err(ConfigError::validation(
            "Polling limit must be between 0 and 100",
        ));
    }

    Ok(())
}

fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("bot.api_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {valid_schemes:?}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&PewterConfig::default()).is_ok());
    }

    #[test]
    fn polling_requires_token() {
        let mut config = PewterConfig::default();
        assert!(matches!(
            validate_for_polling(&config),
            Err(ConfigError::MissingField { .. })
        ));
        config.bot.token = "123:abc".into();
        assert!(validate_for_polling(&config).is_ok());
    }

    #[test]
    fn rejects_zero_pool_and_buffer() {
        let mut config = PewterConfig::default();
        config.polling.pool_size = 0;
        assert!(validate_config(&config).is_err());

        let mut config = PewterConfig::default();
        config.polling.buffer = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn request_timeout_must_exceed_long_poll() {
        let mut config = PewterConfig::default();
        config.polling.timeout_secs = 30;
        config.polling.request_timeout_secs = 30;
        assert!(validate_config(&config).is_err());

        config.polling.request_timeout_secs = 35;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_malformed_api_url() {
        let mut config = PewterConfig::default();
        config.bot.api_url = "api.telegram.org".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
