//! Connection lifecycle and health snapshots.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a feed connection.
///
/// `Closed` is terminal and only reachable through an explicit close.
/// `Failed` is reached when reconnect attempts are exhausted; a supervisor
/// may restart from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Failed,
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Reconnecting => "RECONNECTING",
            Self::Failed => "FAILED",
            Self::Closed => "CLOSED",
        };
        f.write_str(s)
    }
}

/// Summary of a latency sample window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub avg: Duration,
    pub min: Duration,
    pub max: Duration,
    pub count: usize,
}

impl LatencyStats {
    #[must_use]
    pub fn from_samples<'a>(samples: impl IntoIterator<Item = &'a Duration>) -> Self {
        let mut count = 0usize;
        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;
        for sample in samples {
            count += 1;
            total += *sample;
            min = min.min(*sample);
            max = max.max(*sample);
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            avg: total / u32::try_from(count).unwrap_or(u32::MAX),
            min,
            max,
            count,
        }
    }
}

/// Health snapshot maintained by the health monitor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: ConnectionState,
    pub consecutive_failures: u32,
    pub latency: LatencyStats,
    pub last_success: Option<DateTime<Utc>>,
    pub last_check: Option<DateTime<Utc>>,
    pub health_score: u8,
}

impl HealthStatus {
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.state.is_connected() && self.consecutive_failures == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_stats_from_samples() {
        let samples = [
            Duration::from_millis(10),
            Duration::from_millis(30),
            Duration::from_millis(20),
        ];
        let stats = LatencyStats::from_samples(&samples);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.avg, Duration::from_millis(20));
        assert_eq!(stats.min, Duration::from_millis(10));
        assert_eq!(stats.max, Duration::from_millis(30));
    }

    #[test]
    fn empty_window_is_zeroed() {
        assert_eq!(LatencyStats::from_samples(&[]), LatencyStats::default());
    }

    #[test]
    fn state_display_matches_wire_names() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "RECONNECTING");
        let json = serde_json::to_string(&ConnectionState::Failed).unwrap();
        assert_eq!(json, "\"FAILED\"");
    }
}
