//! Periodic supervision of the feed connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::application::metrics::MetricsCollector;
use crate::application::stream::StreamConnection;
use crate::domain::{ConnectionState, HealthStatus};
use crate::error::Result;
use crate::port::{Alert, AlertNotifier};

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Consecutive failed checks before alerting and restarting.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Minimum gap between two alerts of the same kind.
    #[serde(default = "default_alert_cooldown_secs")]
    pub alert_cooldown_secs: u64,
    #[serde(default = "default_max_avg_latency_ms")]
    pub max_avg_latency_ms: u64,
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,
}

fn default_check_interval_secs() -> u64 {
    30
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_alert_cooldown_secs() -> u64 {
    300
}

fn default_max_avg_latency_ms() -> u64 {
    300
}

fn default_max_latency_ms() -> u64 {
    1000
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            failure_threshold: default_failure_threshold(),
            alert_cooldown_secs: default_alert_cooldown_secs(),
            max_avg_latency_ms: default_max_avg_latency_ms(),
            max_latency_ms: default_max_latency_ms(),
        }
    }
}

impl HealthConfig {
    fn cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_secs)
    }

    fn max_avg_latency(&self) -> Duration {
        Duration::from_millis(self.max_avg_latency_ms)
    }

    fn max_latency(&self) -> Duration {
        Duration::from_millis(self.max_latency_ms)
    }
}

/// A connection the monitor can inspect and restart.
#[async_trait]
pub trait Supervised: Send + Sync {
    fn connection_state(&self) -> ConnectionState;

    async fn restart(&self) -> Result<()>;
}

#[async_trait]
impl Supervised for StreamConnection {
    fn connection_state(&self) -> ConnectionState {
        self.state()
    }

    async fn restart(&self) -> Result<()> {
        StreamConnection::restart(self)
    }
}

#[derive(Default)]
struct MonitorState {
    status: HealthStatus,
    last_restart_alert: Option<Instant>,
    last_latency_alert: Option<Instant>,
}

fn cooled_down(last: Option<Instant>, cooldown: Duration) -> bool {
    last.map_or(true, |at| at.elapsed() >= cooldown)
}

/// Watches a [`Supervised`] connection and intervenes on sustained failure.
pub struct HealthMonitor {
    config: HealthConfig,
    target: Arc<dyn Supervised>,
    metrics: Arc<MetricsCollector>,
    notifier: Arc<dyn AlertNotifier>,
    state: Mutex<MonitorState>,
    task: Mutex<Option<(JoinHandle<()>, watch::Sender<bool>)>>,
}

impl HealthMonitor {
    pub fn new(
        config: HealthConfig,
        target: Arc<dyn Supervised>,
        metrics: Arc<MetricsCollector>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        Self {
            config,
            target,
            metrics,
            notifier,
            state: Mutex::new(MonitorState::default()),
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn status(&self) -> HealthStatus {
        self.state.lock().status.clone()
    }

    /// Run a single check and return the updated status.
    pub async fn check_once(&self) -> HealthStatus {
        let connection = self.target.connection_state();
        let latency = self.metrics.latency_stats();
        let score = self.metrics.health_score(self.config.max_avg_latency());

        let should_restart = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state.status.state = connection;
            state.status.latency = latency;
            state.status.health_score = score;
            state.status.last_check = Some(Utc::now());

            if connection.is_closed() {
                debug!("Feed closed, skipping health check");
                return state.status.clone();
            }

            if connection.is_connected() {
                state.status.consecutive_failures = 0;
                state.status.last_success = state.status.last_check;
                self.check_latency(state);
                return state.status.clone();
            }

            state.status.consecutive_failures += 1;
            let failures = state.status.consecutive_failures;
            warn!(failures, state = %connection, "Feed health check failed");

            if failures >= self.config.failure_threshold
                && cooled_down(state.last_restart_alert, self.config.cooldown())
            {
                state.last_restart_alert = Some(Instant::now());
                self.notifier.notify(Alert::critical(
                    "Feed connection down",
                    format!("{failures} consecutive failed health checks, state {connection}"),
                ));
                true
            } else {
                false
            }
        };

        if should_restart {
            match self.target.restart().await {
                Ok(()) => {
                    info!("Feed restart issued");
                    self.state.lock().status.consecutive_failures = 0;
                }
                Err(err) => {
                    error!(error = %err, "Feed restart failed");
                    self.notifier
                        .notify(Alert::critical("Feed restart failed", err.to_string()));
                }
            }
        }

        self.status()
    }

    fn check_latency(&self, state: &mut MonitorState) {
        let latency = state.status.latency;
        if latency.count == 0 {
            return;
        }
        let avg_high = latency.avg > self.config.max_avg_latency();
        let max_high = latency.max > self.config.max_latency();
        if !(avg_high || max_high) {
            return;
        }

        warn!(
            avg_ms = latency.avg.as_millis() as u64,
            max_ms = latency.max.as_millis() as u64,
            "Feed latency above threshold"
        );
        if cooled_down(state.last_latency_alert, self.config.cooldown()) {
            state.last_latency_alert = Some(Instant::now());
            self.notifier.notify(Alert::warning(
                "Feed latency high",
                format!(
                    "avg {}ms max {}ms over {} samples",
                    latency.avg.as_millis(),
                    latency.max.as_millis(),
                    latency.count
                ),
            ));
        }
    }

    /// Start periodic checks. No-op if already running.
    pub fn spawn(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|(handle, _)| !handle.is_finished()) {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let monitor = Arc::clone(self);
        let period = Duration::from_secs(self.config.check_interval_secs.max(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.check_once().await;
                    }
                    () = async { let _ = stop_rx.wait_for(|stop| *stop).await; } => break,
                }
            }
            debug!("Health monitor stopped");
        });
        *task = Some((handle, stop_tx));
    }

    /// Stop periodic checks and wait for the task to exit. Safe to call
    /// more than once.
    pub async fn stop(&self) {
        let task = self.task.lock().take();
        if let Some((handle, stop)) = task {
            stop.send_replace(true);
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::{ConnectionState, LatencyStats};
    use crate::port::AlertSeverity;
    use crate::testkit::notifier::RecordingNotifier;
    use crate::testkit::supervisor::FakeSupervisor;

    fn monitor(
        supervisor: &Arc<FakeSupervisor>,
        notifier: &Arc<RecordingNotifier>,
    ) -> (HealthMonitor, Arc<MetricsCollector>) {
        let metrics = Arc::new(MetricsCollector::default());
        let monitor = HealthMonitor::new(
            HealthConfig::default(),
            supervisor.clone(),
            metrics.clone(),
            notifier.clone(),
        );
        (monitor, metrics)
    }

    #[tokio::test(start_paused = true)]
    async fn five_failures_alert_and_restart_once() {
        let supervisor = Arc::new(FakeSupervisor::new(ConnectionState::Failed));
        let notifier = Arc::new(RecordingNotifier::new());
        let (monitor, _) = monitor(&supervisor, &notifier);

        for _ in 0..4 {
            monitor.check_once().await;
        }
        assert!(notifier.alerts().is_empty());
        assert_eq!(monitor.status().consecutive_failures, 4);

        monitor.check_once().await;
        assert_eq!(notifier.alerts().len(), 1);
        assert_eq!(notifier.alerts()[0].severity, AlertSeverity::Critical);
        assert_eq!(supervisor.restarts(), 1);
        assert_eq!(monitor.status().consecutive_failures, 0);

        // Streak continues inside the cooldown window.
        for _ in 0..6 {
            monitor.check_once().await;
        }
        assert_eq!(notifier.alerts().len(), 1);
        assert_eq!(supervisor.restarts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn alerts_again_after_cooldown() {
        let supervisor = Arc::new(FakeSupervisor::new(ConnectionState::Reconnecting));
        let notifier = Arc::new(RecordingNotifier::new());
        let (monitor, _) = monitor(&supervisor, &notifier);

        for _ in 0..5 {
            monitor.check_once().await;
        }
        tokio::time::advance(Duration::from_secs(301)).await;
        for _ in 0..5 {
            monitor.check_once().await;
        }
        assert_eq!(notifier.alerts().len(), 2);
        assert_eq!(supervisor.restarts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_failure_alerts_and_keeps_streak() {
        let supervisor = Arc::new(FakeSupervisor::new(ConnectionState::Failed));
        supervisor.fail_restarts(true);
        let notifier = Arc::new(RecordingNotifier::new());
        let (monitor, _) = monitor(&supervisor, &notifier);

        for _ in 0..5 {
            monitor.check_once().await;
        }
        let titles: Vec<_> = notifier.alerts().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, ["Feed connection down", "Feed restart failed"]);
        assert_eq!(monitor.status().consecutive_failures, 5);

        monitor.check_once().await;
        assert_eq!(notifier.alerts().len(), 2);
        assert_eq!(monitor.status().consecutive_failures, 6);
    }

    #[tokio::test]
    async fn closed_connection_is_not_a_failure() {
        let supervisor = Arc::new(FakeSupervisor::new(ConnectionState::Closed));
        let notifier = Arc::new(RecordingNotifier::new());
        let (monitor, _) = monitor(&supervisor, &notifier);

        for _ in 0..10 {
            monitor.check_once().await;
        }
        let status = monitor.status();
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.state, ConnectionState::Closed);
        assert_eq!(supervisor.restarts(), 0);
    }

    #[tokio::test]
    async fn success_resets_streak_and_warns_on_latency() {
        let supervisor = Arc::new(FakeSupervisor::new(ConnectionState::Reconnecting));
        let notifier = Arc::new(RecordingNotifier::new());
        let (monitor, metrics) = monitor(&supervisor, &notifier);

        monitor.check_once().await;
        monitor.check_once().await;
        supervisor.set_state(ConnectionState::Connected);
        metrics.record_processed(Duration::from_millis(400));
        metrics.record_processed(Duration::from_millis(1500));

        let status = monitor.check_once().await;
        assert!(status.is_healthy());
        assert!(status.last_success.is_some());
        assert_eq!(
            status.latency,
            LatencyStats {
                avg: Duration::from_millis(950),
                min: Duration::from_millis(400),
                max: Duration::from_millis(1500),
                count: 2,
            }
        );

        let alerts = notifier.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Warning);

        // latency warnings share the cooldown
        monitor.check_once().await;
        assert_eq!(notifier.alerts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_and_stop_are_idempotent() {
        let supervisor = Arc::new(FakeSupervisor::new(ConnectionState::Failed));
        let notifier = Arc::new(RecordingNotifier::new());
        let (monitor, _) = monitor(&supervisor, &notifier);
        let monitor = Arc::new(monitor);

        monitor.spawn();
        monitor.spawn();
        tokio::time::sleep(Duration::from_secs(5 * 30 + 1)).await;
        assert_eq!(supervisor.restarts(), 1);

        monitor.stop().await;
        monitor.stop().await;
        let checked = monitor.status().last_check;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(monitor.status().last_check, checked);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn periodic_checks_run_on_worker_threads() {
        let supervisor = Arc::new(FakeSupervisor::new(ConnectionState::Connected));
        let notifier = Arc::new(RecordingNotifier::new());
        let monitor = Arc::new(HealthMonitor::new(
            HealthConfig {
                check_interval_secs: 1,
                ..HealthConfig::default()
            },
            supervisor.clone(),
            Arc::new(MetricsCollector::default()),
            notifier.clone(),
        ));

        monitor.spawn();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        monitor.stop().await;
        assert!(monitor.status().last_check.is_some());
        assert!(notifier.alerts().is_empty());
    }
}
