// ============================
// greenpoll-backend-lib/src/config.rs
// ============================

//! Configuration management.
use std::net::SocketAddr;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::services::NUM_USER_SESSIONS;

/// One hour, the default lifetime for both token kinds.
const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level / tracing filter directive
    pub log_level: String,
    /// Public base URL used in emailed links
    pub app_url: String,
    /// Session limits
    pub sessions: SessionSettings,
    /// Token lifetimes
    pub tokens: TokenSettings,
    /// SMTP transport; emails are logged instead when absent
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Maximum concurrent sessions per user
    pub max_per_user: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    /// Verification token TTL in seconds
    pub verify_ttl_secs: u64,
    /// Password reset token TTL in seconds
    pub password_reset_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address, e.g. "GreenPoll <noreply@example.com>"
    pub from: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().expect("static addr"),
            log_level: "info".to_string(),
            app_url: "http://localhost:3000".to_string(),
            sessions: SessionSettings::default(),
            tokens: TokenSettings::default(),
            smtp: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_per_user: NUM_USER_SESSIONS,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            verify_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            password_reset_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` and `GREENPOLL_`-prefixed
    /// environment variables, layered over the defaults.
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load settings from an explicit config file path.
    pub fn load_from(path: &str) -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("GREENPOLL_").split("__"))
            .extract()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.sessions.max_per_user, 4);
        assert_eq!(settings.tokens.verify_ttl_secs, 3600);
        assert_eq!(settings.tokens.password_reset_ttl_secs, 3600);
        assert!(settings.smtp.is_none());
    }

    #[test]
    fn test_load_without_config_file_uses_defaults() {
        let settings = Settings::load_from("does-not-exist.toml").unwrap();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.bind_addr.port(), 3000);
    }
}
