//! Configuration management for the triage bot.
//!
//! Loads configuration from environment variables (optionally seeded from a
//! `.env` file by the binary). Channel and role identifiers are required;
//! everything else has a default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use triage_core::ids::{ChannelId, RoleId};

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,triage_bot=debug";

/// Seconds to wait for in-flight runs on shutdown when `SHUTDOWN_TIMEOUT` is unset.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },
}

/// Channel and role identifiers both engines decide on.
///
/// Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Channel whose messages are request tickets
    pub requests_channel: ChannelId,
    /// Voice channel that provisions a personal room on join
    pub create_voice_channel: ChannelId,
    /// Category holding the dynamic voice rooms
    pub voice_category: ChannelId,
    /// AFK voice channel, never deleted
    pub afk_channel: ChannelId,
    /// Role allowed to approve and report requests
    pub developer_role: RoleId,
    /// Role whose members join every claimed thread
    pub moderator_role: RoleId,
}

impl DeskConfig {
    /// `true` for channels that are never deleted automatically.
    #[must_use]
    pub fn is_protected(&self, channel: ChannelId) -> bool {
        channel == self.create_voice_channel || channel == self.afk_channel
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::Invalid {
                key: "LOG_FORMAT",
                value: value.to_string(),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    token: Option<String>,
    /// Engine configuration
    pub desk: DeskConfig,
    /// Logging configuration
    pub log: LogConfig,
    /// Prometheus listener, disabled when `None`
    pub metrics_addr: Option<SocketAddr>,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("desk", &self.desk)
            .field("log", &self.log)
            .field("metrics_addr", &self.metrics_addr)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required identifier is missing or any
    /// variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let desk = DeskConfig {
            requests_channel: required_id(&lookup, "REQUESTS_CHANNEL_ID")?,
            create_voice_channel: required_id(&lookup, "CREATE_VOICE_CHANNEL_ID")?,
            voice_category: required_id(&lookup, "VOICE_CATEGORY_ID")?,
            afk_channel: required_id(&lookup, "AFK_CHANNEL_ID")?,
            developer_role: required_id(&lookup, "DEVELOPER_ROLE_ID")?,
            moderator_role: required_id(&lookup, "MODERATOR_ROLE_ID")?,
        };

        let log = LogConfig {
            filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            format: lookup("LOG_FORMAT")
                .map(|value| value.parse::<LogFormat>())
                .transpose()?
                .unwrap_or_default(),
        };

        let metrics_addr = lookup("METRICS_ADDR")
            .map(|value| parse_value("METRICS_ADDR", &value))
            .transpose()?;

        let shutdown_timeout = lookup("SHUTDOWN_TIMEOUT")
            .map(|value| parse_value("SHUTDOWN_TIMEOUT", &value))
            .transpose()?
            .map_or(
                Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
                Duration::from_secs,
            );

        Ok(Self {
            token: lookup("DISCORD_TOKEN").or_else(|| lookup("TOKEN")),
            desk,
            log,
            metrics_addr,
            shutdown_timeout,
        })
    }

    /// The bot token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when neither `DISCORD_TOKEN` nor `TOKEN` is set.
    pub fn token(&self) -> Result<&str, ConfigError> {
        self.token.as_deref().ok_or(ConfigError::Missing("DISCORD_TOKEN"))
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn required_id<T, F>(lookup: &F, key: &'static str) -> Result<T, ConfigError>
where
    T: From<u64>,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).ok_or(ConfigError::Missing(key))?;
    match parse_value::<u64>(key, &raw)? {
        0 => Err(ConfigError::Invalid { key, value: raw }),
        id => Ok(T::from(id)),
    }
}
