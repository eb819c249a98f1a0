//! Service configuration
//!
//! Defaults match the production deployment; each value can be overridden
//! through a `CHANGE_FEED_*` environment variable.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::backpressure::DEFAULT_MAILBOX_CAPACITY;
use crate::event_log::DEFAULT_LOG_CAPACITY;

/// Idle interval after which a stream emits a `ping`.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(25);

pub const ENV_ADDR: &str = "CHANGE_FEED_ADDR";
pub const ENV_LOG_CAPACITY: &str = "CHANGE_FEED_LOG_CAPACITY";
pub const ENV_MAILBOX_CAPACITY: &str = "CHANGE_FEED_MAILBOX_CAPACITY";
pub const ENV_HEARTBEAT_SECS: &str = "CHANGE_FEED_HEARTBEAT_SECS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
}

/// Sizing of the change-feed core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Events retained per entity for catch-up.
    pub log_capacity: usize,
    /// Undelivered events a single subscriber may hold.
    pub mailbox_capacity: usize,
    /// Idle time before a heartbeat is sent on a stream.
    pub heartbeat_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            heartbeat_interval: DEFAULT_HEARTBEAT,
        }
    }
}

/// Configuration for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub feed: FeedConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            feed: FeedConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parse_var(&lookup, ENV_ADDR)? {
            config.bind_addr = addr;
        }
        if let Some(capacity) = parse_nonzero(&lookup, ENV_LOG_CAPACITY)? {
            config.feed.log_capacity = capacity as usize;
        }
        if let Some(capacity) = parse_nonzero(&lookup, ENV_MAILBOX_CAPACITY)? {
            config.feed.mailbox_capacity = capacity as usize;
        }
        if let Some(secs) = parse_nonzero(&lookup, ENV_HEARTBEAT_SECS)? {
            config.feed.heartbeat_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn parse_nonzero<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<F, u64>(lookup, key)? {
        Some(0) => Err(ConfigError::Zero { key }),
        other => Ok(other),
    }
}
