//! Resilient feed connection.
//!
//! A [`StreamConnection`] owns one logical connection to the exchange feed.
//! A single driver task owns the physical [`FeedTransport`], the heartbeat
//! and liveness timers, and the reconnect loop. Callers talk to the driver
//! through a command channel and observe it through a `watch` channel of
//! [`ConnectionState`].
//!
//! State machine:
//!
//! ```text
//! DISCONNECTED -> CONNECTING -> CONNECTED -> RECONNECTING -> CONNECTED
//!                                            RECONNECTING -> FAILED
//! any -> CLOSED (close() only, terminal)
//! ```

mod backoff;
pub mod config;

pub use backoff::Backoff;
pub use config::{FeedConfig, ReconnectionConfig};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::application::cache::OddsCache;
use crate::application::metrics::MetricsCollector;
use crate::domain::{ConnectionState, MarketId, OddsUpdate};
use crate::error::{Error, Result};
use crate::port::{FeedMessage, FeedTransport, OutboundFrame};

/// Produces a fresh transport for every connection attempt.
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn FeedTransport> + Send + Sync>;

#[derive(Debug)]
enum Command {
    Subscribe(Vec<MarketId>),
    Reconnect,
}

/// Why a connected session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Lost,
    Reconnect,
    Shutdown,
}

struct Shared {
    factory: TransportFactory,
    feed: FeedConfig,
    backoff: Backoff,
    max_attempts: u32,
    cache: Arc<OddsCache>,
    metrics: Arc<MetricsCollector>,
    state: watch::Sender<ConnectionState>,
    subscriptions: watch::Sender<BTreeSet<MarketId>>,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    /// Publish a state change. `Closed` is never overwritten.
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|state| {
            if state.is_closed() || *state == next {
                return false;
            }
            debug!(from = %state, to = %next, "Feed state change");
            *state = next;
            true
        });
    }

    fn subscription_list(&self) -> Vec<MarketId> {
        self.subscriptions.borrow().iter().cloned().collect()
    }

    fn subscribe_frame(&self, market_ids: Vec<MarketId>) -> OutboundFrame {
        OutboundFrame::Subscribe {
            market_ids,
            conflate_ms: self.feed.conflate_ms,
        }
    }

    fn handle_message(&self, message: FeedMessage, started: Instant) {
        self.metrics.record_received();
        match message {
            FeedMessage::MarketChange {
                updates,
                published_at,
            } => {
                let latency = published_at
                    .and_then(|published| (Utc::now() - published).to_std().ok())
                    .unwrap_or_else(|| started.elapsed());
                for update in updates {
                    self.cache.store(update);
                }
                self.metrics.record_processed(latency);
            }
            FeedMessage::Heartbeat => debug!("Feed heartbeat"),
            FeedMessage::Status { detail } => info!(detail = %detail, "Feed status"),
            FeedMessage::Malformed { reason } => {
                warn!(reason = %reason, "Dropping malformed feed frame");
                self.metrics.record_malformed();
            }
            FeedMessage::Ignored { op } => debug!(op = %op, "Ignoring feed frame"),
        }
    }
}

struct Driver {
    handle: JoinHandle<()>,
    commands: mpsc::Sender<Command>,
}

impl Driver {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// One logical connection to the odds feed.
pub struct StreamConnection {
    shared: Arc<Shared>,
    driver: Mutex<Option<Driver>>,
}

impl StreamConnection {
    #[must_use]
    pub fn new(
        factory: TransportFactory,
        feed: FeedConfig,
        reconnection: &ReconnectionConfig,
        cache: Arc<OddsCache>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let (subscriptions, _) = watch::channel(feed.market_ids.iter().cloned().collect());
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                factory,
                backoff: Backoff::from_config(reconnection),
                max_attempts: reconnection.max_attempts,
                feed,
                cache,
                metrics,
                state,
                subscriptions,
                shutdown,
            }),
            driver: Mutex::new(None),
        }
    }

    /// Start the connection driver.
    ///
    /// Returns immediately; progress is observable through
    /// [`watch_state`](Self::watch_state). Calling this while the driver is
    /// running is a no-op. Fails once the connection has been closed.
    pub fn connect(&self) -> Result<()> {
        if self.state().is_closed() {
            return Err(Error::Connection("feed connection is closed".into()));
        }
        let mut driver = self.driver.lock();
        if driver.as_ref().is_some_and(Driver::is_running) {
            return Ok(());
        }
        *driver = Some(self.spawn_driver());
        Ok(())
    }

    /// Add markets to the subscription set.
    ///
    /// The full set is sent to the feed while connected and again on every
    /// reconnect.
    pub fn subscribe(&self, market_ids: &[MarketId]) {
        let added = self.shared.subscriptions.send_if_modified(|subscriptions| {
            market_ids
                .iter()
                .fold(false, |added, id| subscriptions.insert(id.clone()) || added)
        });
        if !added {
            return;
        }

        let driver = self.driver.lock();
        if let Some(driver) = driver.as_ref().filter(|d| d.is_running()) {
            let frame = Command::Subscribe(self.shared.subscription_list());
            if let Err(err) = driver.commands.try_send(frame) {
                warn!(error = %err, "Subscription deferred to next reconnect");
            }
        }
    }

    /// Every update stored by this connection, across all markets.
    #[must_use]
    pub fn updates(&self) -> broadcast::Receiver<OddsUpdate> {
        self.shared.cache.subscribe_all()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Snapshot of the subscribed markets.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<MarketId> {
        self.shared.subscription_list()
    }

    /// The subscription set, notified whenever markets are added.
    #[must_use]
    pub fn watch_subscriptions(&self) -> watch::Receiver<BTreeSet<MarketId>> {
        self.shared.subscriptions.subscribe()
    }

    /// Force a fresh connection.
    ///
    /// From `FAILED` or `DISCONNECTED` a new driver is started. While
    /// connected or waiting to reconnect, the current session is dropped and
    /// a reconnect happens immediately. No-op while connecting or after close.
    pub fn restart(&self) -> Result<()> {
        let state = self.state();
        let mut driver = self.driver.lock();
        match state {
            ConnectionState::Closed | ConnectionState::Connecting => Ok(()),
            ConnectionState::Connected | ConnectionState::Reconnecting
                if driver.as_ref().is_some_and(Driver::is_running) =>
            {
                info!(state = %state, "Feed restart requested");
                driver
                    .as_ref()
                    .map_or(Ok(()), |d| d.commands.try_send(Command::Reconnect))
                    .map_err(|err| Error::Connection(format!("restart not delivered: {err}")))
            }
            _ => {
                info!(state = %state, "Starting fresh feed driver");
                if let Some(old) = driver.take() {
                    old.handle.abort();
                }
                *driver = Some(self.spawn_driver());
                Ok(())
            }
        }
    }

    /// Close the connection and stop both timers.
    ///
    /// Waits for the driver to exit. Safe to call more than once.
    pub async fn close(&self) {
        self.shared.state.send_replace(ConnectionState::Closed);
        self.shared.shutdown.send_replace(true);
        let driver = self.driver.lock().take();
        if let Some(Driver { handle, commands }) = driver {
            drop(commands);
            if let Err(err) = handle.await {
                if err.is_panic() {
                    error!(error = %err, "Feed driver panicked");
                }
            }
            info!("Feed connection closed");
        }
    }

    fn spawn_driver(&self) -> Driver {
        self.shared.set_state(ConnectionState::Connecting);
        let (commands, rx) = mpsc::channel(self.shared.feed.command_capacity.max(1));
        let handle = tokio::spawn(drive(Arc::clone(&self.shared), rx));
        Driver { handle, commands }
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.get_mut().take() {
            driver.handle.abort();
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Connect and send the current subscription set.
async fn open(shared: &Shared, transport: &mut Box<dyn FeedTransport>) -> Result<()> {
    transport.connect().await?;
    let market_ids = shared.subscription_list();
    if !market_ids.is_empty() {
        debug!(markets = market_ids.len(), "Subscribing");
        transport.send(shared.subscribe_frame(market_ids)).await?;
    }
    Ok(())
}

async fn drive(shared: Arc<Shared>, mut commands: mpsc::Receiver<Command>) {
    let mut shutdown = shared.shutdown.subscribe();
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            return;
        }

        let mut transport = (shared.factory)();
        let opened = tokio::select! {
            result = open(&shared, &mut transport) => result,
            () = wait_for_shutdown(&mut shutdown) => {
                transport.close().await;
                return;
            }
        };

        let end = match opened {
            Ok(()) => {
                attempt = 0;
                shared.set_state(ConnectionState::Connected);
                info!(transport = transport.transport_name(), "Feed connected");
                run_session(&shared, &mut transport, &mut commands, &mut shutdown).await
            }
            Err(err) => {
                warn!(error = %err, "Feed connect failed");
                shared.metrics.record_error();
                SessionEnd::Lost
            }
        };
        transport.close().await;

        if end == SessionEnd::Shutdown {
            return;
        }
        if end == SessionEnd::Reconnect {
            attempt = 0;
        }

        shared.metrics.record_reconnect();
        attempt += 1;
        if attempt > shared.max_attempts {
            error!(
                attempts = shared.max_attempts,
                "Reconnect attempts exhausted, feed failed"
            );
            shared.set_state(ConnectionState::Failed);
            return;
        }
        shared.set_state(ConnectionState::Reconnecting);

        let delay = if end == SessionEnd::Reconnect {
            Duration::ZERO
        } else {
            shared.backoff.delay(attempt)
        };
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt,
            "Reconnecting after delay"
        );

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => break,
                command = commands.recv() => match command {
                    Some(Command::Reconnect) => break,
                    // The full set is resent on connect.
                    Some(Command::Subscribe(_)) => {}
                    None => return,
                },
                () = wait_for_shutdown(&mut shutdown) => return,
            }
        }
    }
}

async fn run_session(
    shared: &Shared,
    transport: &mut Box<dyn FeedTransport>,
    commands: &mut mpsc::Receiver<Command>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let period = Duration::from_secs(shared.feed.heartbeat_interval_secs.max(1));
    let stale_after = Duration::from_secs(shared.feed.stale_threshold_secs);

    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut liveness = interval_at(Instant::now() + period, period);
    liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_message = Instant::now();

    loop {
        tokio::select! {
            message = transport.next_message() => match message {
                Some(Ok(message)) => {
                    let started = Instant::now();
                    last_message = started;
                    shared.handle_message(message, started);
                }
                Some(Err(err)) => {
                    warn!(error = %err, "Feed transport error");
                    shared.metrics.record_error();
                    return SessionEnd::Lost;
                }
                None => {
                    warn!("Feed closed by peer");
                    return SessionEnd::Lost;
                }
            },
            _ = heartbeat.tick() => {
                if transport.is_open() {
                    if let Err(err) = transport.send(OutboundFrame::Heartbeat).await {
                        warn!(error = %err, "Heartbeat failed");
                        shared.metrics.record_error();
                        return SessionEnd::Lost;
                    }
                }
            }
            _ = liveness.tick() => {
                let silent = last_message.elapsed();
                if silent > stale_after {
                    if transport.is_open() {
                        warn!(silent_secs = silent.as_secs(), "Feed quiet but socket open");
                    } else {
                        warn!(silent_secs = silent.as_secs(), "Feed stale and socket closed, forcing reconnect");
                        return SessionEnd::Lost;
                    }
                }
            }
            command = commands.recv() => match command {
                Some(Command::Subscribe(market_ids)) => {
                    debug!(markets = market_ids.len(), "Updating subscription");
                    if let Err(err) = transport.send(shared.subscribe_frame(market_ids)).await {
                        warn!(error = %err, "Subscribe failed");
                        shared.metrics.record_error();
                        return SessionEnd::Lost;
                    }
                }
                Some(Command::Reconnect) => {
                    info!("Reconnect requested");
                    return SessionEnd::Reconnect;
                }
                None => return SessionEnd::Shutdown,
            },
            () = wait_for_shutdown(shutdown) => return SessionEnd::Shutdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::{OddsStatus, OutcomeId};
    use crate::testkit;
    use crate::testkit::feed::ScriptedFeed;

    fn reconnection(max_attempts: u32) -> ReconnectionConfig {
        ReconnectionConfig {
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            max_attempts,
            jitter: false,
        }
    }

    fn connection(feed: &ScriptedFeed, max_attempts: u32) -> StreamConnection {
        let config = FeedConfig {
            market_ids: vec![MarketId::from("1.100")],
            ..FeedConfig::default()
        };
        StreamConnection::new(
            feed.factory(),
            config,
            &reconnection(max_attempts),
            Arc::new(OddsCache::default()),
            Arc::new(MetricsCollector::default()),
        )
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..10_000 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn connect_subscribes_and_stores_updates() {
        let feed = ScriptedFeed::new();
        let stream = connection(&feed, 3);
        let mut updates = stream.updates();

        stream.connect().unwrap();
        wait_until(|| stream.state().is_connected()).await;
        assert_eq!(
            feed.sent_frames()[0],
            OutboundFrame::Subscribe {
                market_ids: vec![MarketId::from("1.100")],
                conflate_ms: 0,
            }
        );

        feed.push(testkit::feed::market_change("1.100", &[("47972", "2.5")]));
        let update = updates.recv().await.unwrap();
        assert_eq!(update.outcome_id, OutcomeId::from("47972"));
        assert_eq!(update.status, OddsStatus::Active);
        assert_eq!(stream.shared.metrics.snapshot().totals.processed, 1);

        stream.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_sent_on_interval() {
        let feed = ScriptedFeed::new();
        let stream = connection(&feed, 3);
        stream.connect().unwrap();
        wait_until(|| stream.state().is_connected()).await;

        tokio::time::sleep(Duration::from_secs(31)).await;
        let heartbeats = feed
            .sent_frames()
            .into_iter()
            .filter(|f| *f == OutboundFrame::Heartbeat)
            .count();
        assert_eq!(heartbeats, 1);

        stream.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_then_fails() {
        let feed = ScriptedFeed::new();
        feed.fail_connects(usize::MAX);
        let stream = connection(&feed, 3);

        stream.connect().unwrap();
        wait_until(|| stream.state() == ConnectionState::Failed).await;

        let times = feed.connect_times();
        assert_eq!(times.len(), 4);
        for (n, pair) in times.windows(2).enumerate() {
            let expected = Duration::from_millis(1000 << n);
            assert!(pair[1] - pair[0] >= expected, "attempt {} too early", n + 1);
        }

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(feed.connect_attempts(), 4);
        assert_eq!(stream.state(), ConnectionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_resubscribes_after_drop() {
        let feed = ScriptedFeed::new();
        let stream = connection(&feed, 3);
        stream.connect().unwrap();
        wait_until(|| stream.state().is_connected()).await;

        feed.drop_connection();
        wait_until(|| feed.connect_attempts() == 2 && stream.state().is_connected()).await;

        let subscribes = feed
            .sent_frames()
            .into_iter()
            .filter(|f| matches!(f, OutboundFrame::Subscribe { .. }))
            .count();
        assert_eq!(subscribes, 2);
        assert_eq!(stream.shared.metrics.snapshot().totals.reconnects, 1);

        stream.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_while_connected_sends_full_set() {
        let feed = ScriptedFeed::new();
        let stream = connection(&feed, 3);
        stream.connect().unwrap();
        wait_until(|| stream.state().is_connected()).await;

        stream.subscribe(&[MarketId::from("1.200")]);
        wait_until(|| feed.sent_frames().len() == 2).await;
        assert_eq!(
            feed.sent_frames()[1],
            OutboundFrame::Subscribe {
                market_ids: vec![MarketId::from("1.100"), MarketId::from("1.200")],
                conflate_ms: 0,
            }
        );
        assert_eq!(stream.subscriptions().len(), 2);

        // already subscribed: nothing sent
        stream.subscribe(&[MarketId::from("1.200")]);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(feed.sent_frames().len(), 2);

        stream.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stale_closed_socket_forces_reconnect() {
        let feed = ScriptedFeed::new();
        let stream = connection(&feed, 3);
        stream.connect().unwrap();
        wait_until(|| stream.state().is_connected()).await;

        feed.half_close();
        tokio::time::sleep(Duration::from_secs(95)).await;
        wait_until(|| feed.connect_attempts() == 2).await;

        stream.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stale_open_socket_is_kept() {
        let feed = ScriptedFeed::new();
        let stream = connection(&feed, 3);
        stream.connect().unwrap();
        wait_until(|| stream.state().is_connected()).await;

        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(feed.connect_attempts(), 1);
        assert!(stream.state().is_connected());

        stream.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_dropped() {
        let feed = ScriptedFeed::new();
        let stream = connection(&feed, 3);
        let mut updates = stream.updates();
        stream.connect().unwrap();
        wait_until(|| stream.state().is_connected()).await;

        feed.push(FeedMessage::Malformed {
            reason: "expected value at line 1".into(),
        });
        feed.push(testkit::feed::market_change("1.100", &[("1", "3.1")]));
        updates.recv().await.unwrap();

        let totals = stream.shared.metrics.snapshot().totals;
        assert_eq!(totals.malformed, 1);
        assert_eq!(totals.processed, 1);
        assert!(stream.state().is_connected());

        stream.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_terminal_and_idempotent() {
        let feed = ScriptedFeed::new();
        let stream = connection(&feed, 3);
        stream.connect().unwrap();
        wait_until(|| stream.state().is_connected()).await;

        stream.close().await;
        assert_eq!(stream.state(), ConnectionState::Closed);
        assert!(!feed.is_connected());
        let sent = feed.sent_frames().len();

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(feed.sent_frames().len(), sent);

        assert!(stream.connect().is_err());
        stream.restart().unwrap();
        stream.close().await;
        assert_eq!(stream.state(), ConnectionState::Closed);
        assert_eq!(feed.connect_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_failure_starts_fresh_driver() {
        let feed = ScriptedFeed::new();
        feed.fail_connects(2);
        let stream = connection(&feed, 1);

        stream.connect().unwrap();
        wait_until(|| stream.state() == ConnectionState::Failed).await;
        assert_eq!(feed.connect_attempts(), 2);

        stream.restart().unwrap();
        wait_until(|| stream.state().is_connected()).await;
        assert_eq!(feed.connect_attempts(), 3);

        stream.close().await;
    }
}
