//! Feed and reconnection settings.

use serde::Deserialize;

use crate::domain::MarketId;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// WebSocket URL of the streaming API.
    #[serde(default = "default_url")]
    pub url: String,
    /// Markets subscribed on connect.
    #[serde(default)]
    pub market_ids: Vec<MarketId>,
    /// Server-side conflation window sent with subscriptions.
    #[serde(default)]
    pub conflate_ms: u64,
    /// Keep-alive and liveness check cadence.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    /// Silence after which the liveness check inspects the socket.
    #[serde(default = "default_stale_threshold_secs")]
    pub stale_threshold_secs: u64,
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
}

fn default_url() -> String {
    "ws://127.0.0.1:8080/stream".into()
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_stale_threshold_secs() -> u64 {
    60
}

fn default_command_capacity() -> usize {
    64
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            market_ids: Vec::new(),
            conflate_ms: 0,
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            stale_threshold_secs: default_stale_threshold_secs(),
            command_capacity: default_command_capacity(),
        }
    }
}

/// Feed reconnection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    /// Delay before the first reconnect attempt (milliseconds).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on the exponential delay (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Reconnect attempts per outage before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Add up to 20% random delay on top of the exponential delay.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_jitter() -> bool {
    true
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
            jitter: default_jitter(),
        }
    }
}
