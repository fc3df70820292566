//! Feed throughput, error and latency accounting.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use crate::domain::LatencyStats;

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Latency samples retained for statistics.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    /// Processed messages per second below which the feed counts as quiet.
    #[serde(default = "default_min_message_rate")]
    pub min_message_rate: f64,
}

fn default_window_size() -> usize {
    1000
}

fn default_report_interval_secs() -> u64 {
    60
}

fn default_min_message_rate() -> f64 {
    0.1
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            report_interval_secs: default_report_interval_secs(),
            min_message_rate: default_min_message_rate(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub received: u64,
    pub processed: u64,
    pub errors: u64,
    pub malformed: u64,
    pub reconnects: u64,
}

/// Point-in-time metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Counters since the last report.
    pub interval: Counters,
    /// Counters since start.
    pub totals: Counters,
    pub latency: LatencyStats,
    /// Processed messages per second over the current interval.
    pub message_rate: f64,
    pub uptime: Duration,
}

struct Inner {
    interval: Counters,
    totals: Counters,
    samples: VecDeque<Duration>,
    interval_started: Instant,
}

/// Rolling counters and a bounded latency window.
pub struct MetricsCollector {
    config: MetricsConfig,
    started: Instant,
    inner: Mutex<Inner>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        let now = Instant::now();
        let window = config.window_size.max(1);
        Self {
            config,
            started: now,
            inner: Mutex::new(Inner {
                interval: Counters::default(),
                totals: Counters::default(),
                samples: VecDeque::with_capacity(window),
                interval_started: now,
            }),
        }
    }

    fn bump(&self, f: impl Fn(&mut Counters)) {
        let mut inner = self.inner.lock();
        f(&mut inner.interval);
        f(&mut inner.totals);
    }

    pub fn record_received(&self) {
        self.bump(|c| c.received += 1);
    }

    /// Count a processed message and keep its latency sample.
    pub fn record_processed(&self, latency: Duration) {
        let window = self.config.window_size.max(1);
        let mut inner = self.inner.lock();
        inner.interval.processed += 1;
        inner.totals.processed += 1;
        inner.samples.push_back(latency);
        while inner.samples.len() > window {
            inner.samples.pop_front();
        }
    }

    pub fn record_error(&self) {
        self.bump(|c| c.errors += 1);
    }

    /// Malformed frames also count as errors.
    pub fn record_malformed(&self) {
        self.bump(|c| {
            c.malformed += 1;
            c.errors += 1;
        });
    }

    pub fn record_reconnect(&self) {
        self.bump(|c| c.reconnects += 1);
    }

    #[must_use]
    pub fn latency_stats(&self) -> LatencyStats {
        LatencyStats::from_samples(&self.inner.lock().samples)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot_of(&self.inner.lock())
    }

    fn snapshot_of(&self, inner: &Inner) -> MetricsSnapshot {
        let elapsed = inner.interval_started.elapsed();
        MetricsSnapshot {
            interval: inner.interval,
            totals: inner.totals,
            latency: LatencyStats::from_samples(&inner.samples),
            message_rate: rate(inner.interval.processed, elapsed),
            uptime: self.started.elapsed(),
        }
    }

    /// Snapshot, then start a new interval. Totals are kept.
    pub fn report(&self) -> MetricsSnapshot {
        let mut inner = self.inner.lock();
        let snapshot = self.snapshot_of(&inner);
        inner.interval = Counters::default();
        inner.interval_started = Instant::now();
        snapshot
    }

    /// Score in `[0, 100]` penalising errors, latency, a quiet feed and a
    /// fresh start.
    #[must_use]
    pub fn health_score(&self, max_avg_latency: Duration) -> u8 {
        let snapshot = self.snapshot();
        let elapsed_interval = {
            let inner = self.inner.lock();
            inner.interval_started.elapsed()
        };

        let mut score: i64 = 100;
        let errors = i64::try_from(snapshot.interval.errors).unwrap_or(i64::MAX);
        score -= errors.saturating_mul(2).min(30);

        if snapshot.latency.count > 0 {
            if snapshot.latency.avg > max_avg_latency {
                score -= 20;
            } else if snapshot.latency.avg > max_avg_latency / 2 {
                score -= 10;
            }
        }

        if elapsed_interval >= Duration::from_secs(1)
            && snapshot.message_rate < self.config.min_message_rate
        {
            score -= 20;
        }

        if snapshot.uptime < Duration::from_secs(60) {
            score -= 10;
        }

        u8::try_from(score.clamp(0, 100)).unwrap_or(0)
    }

    /// Log a report every `report_interval_secs` until `shutdown` flips.
    pub fn spawn_reporter(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let metrics = Arc::clone(self);
        let period = Duration::from_secs(self.config.report_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = metrics.report();
                        info!(
                            received = report.interval.received,
                            processed = report.interval.processed,
                            errors = report.interval.errors,
                            reconnects = report.interval.reconnects,
                            rate = report.message_rate,
                            avg_latency_ms = report.latency.avg.as_millis() as u64,
                            total_processed = report.totals.processed,
                            "Feed metrics"
                        );
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        0.0
    } else {
        count as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn latency_window_is_bounded() {
        let metrics = MetricsCollector::new(MetricsConfig {
            window_size: 3,
            ..MetricsConfig::default()
        });
        for n in [100, 10, 20, 30] {
            metrics.record_processed(ms(n));
        }
        let stats = metrics.latency_stats();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.max, ms(30));
        assert_eq!(stats.min, ms(10));
    }

    #[test]
    fn report_resets_interval_but_keeps_totals() {
        let metrics = MetricsCollector::default();
        metrics.record_received();
        metrics.record_processed(ms(5));
        metrics.record_malformed();
        metrics.record_reconnect();

        let first = metrics.report();
        assert_eq!(first.interval.received, 1);
        assert_eq!(first.interval.errors, 1);
        assert_eq!(first.interval.malformed, 1);

        let second = metrics.snapshot();
        assert_eq!(second.interval, Counters::default());
        assert_eq!(second.totals.processed, 1);
        assert_eq!(second.totals.reconnects, 1);
    }

    #[test]
    fn reports_account_for_every_count() {
        let metrics = Arc::new(MetricsCollector::default());
        let writers: Vec<_> = (0..4)
            .map(|_| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        metrics.record_received();
                    }
                })
            })
            .collect();

        let mut reported = 0;
        while writers.iter().any(|w| !w.is_finished()) {
            reported += metrics.report().interval.received;
        }
        for writer in writers {
            writer.join().unwrap();
        }
        reported += metrics.report().interval.received;

        assert_eq!(reported, 2000);
        assert_eq!(metrics.snapshot().totals.received, 2000);
    }

    #[tokio::test(start_paused = true)]
    async fn health_score_penalties() {
        let metrics = MetricsCollector::default();
        // fresh start: uptime penalty only
        assert_eq!(metrics.health_score(ms(300)), 90);

        tokio::time::advance(Duration::from_secs(120)).await;
        for _ in 0..20 {
            metrics.record_error();
        }
        // errors capped at 30, quiet feed 20
        assert_eq!(metrics.health_score(ms(300)), 50);

        metrics.report();
        tokio::time::advance(Duration::from_secs(10)).await;
        for _ in 0..10 {
            metrics.record_processed(ms(200));
        }
        // 1 msg/s, avg 200ms is above half the 300ms limit
        assert_eq!(metrics.health_score(ms(300)), 90);
        assert_eq!(metrics.health_score(ms(100)), 80);
    }
}
