//! Telegram transport settings.

use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use support_desk_core::config::{build_config, DeskSettings};

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token.
    pub telegram_token: String,
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the token is missing.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Desk settings shared with the core.
    pub desk: Arc<DeskSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(desk: DeskSettings, telegram: TelegramSettings) -> Self {
        Self {
            desk: Arc::new(desk),
            telegram: Arc::new(telegram),
        }
    }
}

/// Initial delay before retrying a failed Telegram call.
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for a single retry delay.
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Retries after the first failed attempt.
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

/// Cooldown period (seconds) between registration denial notices for the same user.
/// Default: 20 minutes.
pub const REGISTRATION_DENIAL_COOLDOWN_SECS: u64 = 1200;
/// Time-to-live (seconds) for cache entries.
/// Default: 2 hours.
pub const REGISTRATION_DENIAL_CACHE_TTL_SECS: u64 = 7200;
/// Maximum cache capacity (number of entries).
pub const REGISTRATION_DENIAL_CACHE_MAX_SIZE: u64 = 10_000;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get denial cooldown from env or default.
///
/// Environment variable: `REGISTRATION_DENIAL_COOLDOWN_SECS`.
#[must_use]
pub fn get_denial_cooldown() -> u64 {
    env_u64(
        "REGISTRATION_DENIAL_COOLDOWN_SECS",
        REGISTRATION_DENIAL_COOLDOWN_SECS,
    )
}

/// Get denial cache TTL from env or default.
///
/// Environment variable: `REGISTRATION_DENIAL_CACHE_TTL_SECS`.
#[must_use]
pub fn get_denial_cache_ttl() -> u64 {
    env_u64(
        "REGISTRATION_DENIAL_CACHE_TTL_SECS",
        REGISTRATION_DENIAL_CACHE_TTL_SECS,
    )
}

/// Get denial cache max size from env or default.
///
/// Environment variable: `REGISTRATION_DENIAL_CACHE_MAX_SIZE`.
#[must_use]
pub fn get_denial_cache_max_size() -> u64 {
    env_u64(
        "REGISTRATION_DENIAL_CACHE_MAX_SIZE",
        REGISTRATION_DENIAL_CACHE_MAX_SIZE,
    )
}
