//! Latest-price cache with per-market and global update topics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::domain::{MarketId, MarketSnapshot, OddsUpdate, OutcomeId, OutcomeQuote};

/// Name of the topic every update is published on.
pub const ALL_UPDATES_TOPIC: &str = "odds-updates";

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Seconds an update stays readable after its `observedAt`.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Buffered messages per topic before slow receivers lag.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Background purge interval; 0 leaves eviction to reads.
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

fn default_ttl_secs() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            channel_capacity: default_channel_capacity(),
            sweep_interval_secs: 0,
        }
    }
}

type Key = (MarketId, OutcomeId);

/// Store of the freshest update per (market, outcome).
///
/// Writes to different keys land on different shards and never contend.
/// A write only replaces the stored value when it is not older than it,
/// but every write is published so subscribers see each tick. Publishing
/// never waits on receivers; lagging receivers lose the oldest messages.
pub struct OddsCache {
    entries: DashMap<Key, OddsUpdate>,
    topics: DashMap<MarketId, broadcast::Sender<OddsUpdate>>,
    all: broadcast::Sender<OddsUpdate>,
    ttl: chrono::Duration,
    capacity: usize,
}

impl OddsCache {
    #[must_use]
    pub fn new(ttl: Duration, channel_capacity: usize) -> Self {
        let capacity = channel_capacity.max(1);
        let (all, _) = broadcast::channel(capacity);
        Self {
            entries: DashMap::new(),
            topics: DashMap::new(),
            all,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            capacity,
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.channel_capacity)
    }

    /// Logical storage key, `odds:{marketId}:{outcomeId}`.
    #[must_use]
    pub fn storage_key(market_id: &MarketId, outcome_id: &OutcomeId) -> String {
        format!("odds:{market_id}:{outcome_id}")
    }

    /// Store an update and publish it.
    ///
    /// Returns whether the stored value changed.
    pub fn store(&self, update: OddsUpdate) -> bool {
        let key = (update.market_id.clone(), update.outcome_id.clone());
        let stored = match self.entries.entry(key) {
            Entry::Occupied(mut current) => {
                if update.supersedes(current.get()) {
                    current.insert(update.clone());
                    true
                } else {
                    trace!(
                        key = %Self::storage_key(&update.market_id, &update.outcome_id),
                        "Ignoring out-of-order update"
                    );
                    false
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(update.clone());
                true
            }
        };
        self.publish(update);
        stored
    }

    fn publish(&self, update: OddsUpdate) {
        if let Some(topic) = self.topics.get(&update.market_id) {
            let _ = topic.send(update.clone());
        }
        let _ = self.all.send(update);
    }

    /// Current value, or `None` when missing or past the TTL.
    #[must_use]
    pub fn get(&self, market_id: &MarketId, outcome_id: &OutcomeId) -> Option<OddsUpdate> {
        self.get_at(market_id, outcome_id, Utc::now())
    }

    /// [`get`](Self::get) evaluated at `now`.
    #[must_use]
    pub fn get_at(
        &self,
        market_id: &MarketId,
        outcome_id: &OutcomeId,
        now: DateTime<Utc>,
    ) -> Option<OddsUpdate> {
        let key = (market_id.clone(), outcome_id.clone());
        let update = self.entries.get(&key)?.clone();
        if update.is_expired(now, self.ttl) {
            self.entries
                .remove_if(&key, |_, current| current.is_expired(now, self.ttl));
            return None;
        }
        Some(update)
    }

    /// Fresh quotes for every outcome of a market, ordered by outcome id.
    #[must_use]
    pub fn market_snapshot(&self, market_id: &MarketId) -> Option<MarketSnapshot> {
        self.market_snapshot_at(market_id, Utc::now())
    }

    #[must_use]
    pub fn market_snapshot_at(
        &self,
        market_id: &MarketId,
        now: DateTime<Utc>,
    ) -> Option<MarketSnapshot> {
        let mut updates: Vec<OddsUpdate> = self
            .entries
            .iter()
            .filter(|e| &e.key().0 == market_id && !e.value().is_expired(now, self.ttl))
            .map(|e| e.value().clone())
            .collect();
        if updates.is_empty() {
            return None;
        }
        updates.sort_by(|a, b| a.outcome_id.cmp(&b.outcome_id));

        let timestamp = updates
            .iter()
            .map(|u| u.observed_at)
            .max()
            .unwrap_or(now);
        Some(MarketSnapshot {
            market_id: market_id.clone(),
            timestamp,
            quotes: updates.iter().map(OutcomeQuote::from).collect(),
        })
    }

    /// Receive every update published for `market_id`.
    #[must_use]
    pub fn subscribe(&self, market_id: &MarketId) -> broadcast::Receiver<OddsUpdate> {
        self.topics
            .entry(market_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Receive every update on the global topic.
    #[must_use]
    pub fn subscribe_all(&self) -> broadcast::Receiver<OddsUpdate> {
        self.all.subscribe()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, update| !update.is_expired(now, self.ttl));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired odds");
        }
        removed
    }

    /// Number of stored entries, including any not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for OddsCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
