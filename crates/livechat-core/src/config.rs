//! Configuration for the livechat core and runtime
//!
//! Every struct here is serde-friendly so the CLI can layer it from a TOML
//! file, and each carries a `validate()` that rejects values the runtime
//! could not work with.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::{LivechatError, Result};

// ----------------------------------------------------------------------------
// Feed Configuration
// ----------------------------------------------------------------------------

/// Retention and duplicate handling for the feed aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Drop live messages whose id is already buffered
    pub dedupe_by_id: bool,
    /// Upper bound on buffered messages, `None` keeps the whole session
    pub max_messages: Option<usize>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            dedupe_by_id: true,
            max_messages: None,
        }
    }
}

impl FeedConfig {
    /// Plain append/replace behavior with no dedupe and no bound
    pub fn passthrough() -> Self {
        Self {
            dedupe_by_id: false,
            max_messages: None,
        }
    }

    /// Bounded ring buffer of `max_messages` entries
    pub fn bounded(max_messages: usize) -> Self {
        Self {
            max_messages: Some(max_messages),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_messages == Some(0) {
            return Err(LivechatError::invalid_config(
                "feed.max_messages must be greater than 0 when set",
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Session Configuration
// ----------------------------------------------------------------------------

/// Connection and reconnection behavior of the live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the chat server (http, https, ws or wss)
    pub server_url: String,
    /// Socket.IO endpoint path on the server
    pub socket_path: String,
    /// Time allowed for the WebSocket and namespace handshake
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,
    /// First reconnect delay after a drop
    #[serde(with = "duration_millis")]
    pub reconnect_delay: Duration,
    /// Cap for the exponential reconnect delay
    #[serde(with = "duration_millis")]
    pub max_reconnect_delay: Duration,
    /// Randomize reconnect delays to spread reconnect storms
    pub reconnect_jitter: bool,
    /// Buffered feed updates per subscriber before it starts lagging
    pub update_channel_capacity: usize,
    /// Feed retention settings
    pub feed: FeedConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:6842".to_string(),
            socket_path: "/socket.io/".to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            reconnect_jitter: true,
            update_channel_capacity: 256,
            feed: FeedConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Configuration pointed at a specific server
    pub fn with_server(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Fast timings for tests against local servers
    pub fn testing(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            connect_timeout: Duration::from_secs(2),
            reconnect_delay: Duration::from_millis(10),
            max_reconnect_delay: Duration::from_millis(50),
            reconnect_jitter: false,
            update_channel_capacity: 64,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(LivechatError::invalid_config("server_url must not be empty"));
        }
        if !self.socket_path.starts_with('/') {
            return Err(LivechatError::invalid_config(
                "socket_path must start with '/'",
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(LivechatError::invalid_config(
                "connect_timeout must be greater than 0",
            ));
        }
        if self.reconnect_delay > self.max_reconnect_delay {
            return Err(LivechatError::invalid_config(
                "reconnect_delay must not exceed max_reconnect_delay",
            ));
        }
        if self.update_channel_capacity == 0 {
            return Err(LivechatError::invalid_config(
                "update_channel_capacity must be greater than 0",
            ));
        }
        self.feed.validate()
    }
}

mod duration_millis {
    use std::time::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
