//! Composition root for the live pipeline.
//!
//! Every service is constructed once here and handed its collaborators
//! explicitly. Nothing else in the crate holds global state.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::bootstrap::{build_notifier_registry, websocket_factory};
use super::config::settings::Config;
use crate::application::{
    HealthMonitor, LiveEvaluator, MetricsCollector, OddsCache, StreamConnection,
    Supervised, TransportFactory,
};
use crate::domain::{MarketId, StrategyResult};
use crate::error::Result;
use crate::port::AlertNotifier;

const OPPORTUNITY_BUFFER: usize = 256;

/// The wired live services.
pub struct Runtime {
    pub cache: Arc<OddsCache>,
    pub metrics: Arc<MetricsCollector>,
    pub stream: Arc<StreamConnection>,
    pub health: Arc<HealthMonitor>,
    pub live: Arc<LiveEvaluator>,
    sweep_interval: Option<Duration>,
    opportunities: AtomicU64,
}

/// One evaluation task per subscribed market.
struct Evaluators {
    tasks: JoinSet<()>,
    markets: BTreeSet<MarketId>,
    tx: mpsc::Sender<StrategyResult>,
    stop: watch::Receiver<bool>,
}

impl Evaluators {
    /// Start evaluating markets not seen before.
    fn extend(&mut self, live: &Arc<LiveEvaluator>, markets: &BTreeSet<MarketId>) {
        for market_id in markets {
            if !self.markets.insert(market_id.clone()) {
                continue;
            }
            debug!(market_id = %market_id, "Evaluating market");
            let live = Arc::clone(live);
            let market_id = market_id.clone();
            let tx = self.tx.clone();
            let stop = self.stop.clone();
            self.tasks
                .spawn(async move { live.run(market_id, tx, stop).await });
        }
    }
}

impl Runtime {
    /// Wire the services around an explicit transport factory and notifier.
    #[must_use]
    pub fn build(
        config: &Config,
        factory: TransportFactory,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        let cache = Arc::new(OddsCache::from_config(&config.cache));
        let metrics = Arc::new(MetricsCollector::new(config.metrics.clone()));
        let stream = Arc::new(StreamConnection::new(
            factory,
            config.feed.clone(),
            &config.reconnection,
            Arc::clone(&cache),
            Arc::clone(&metrics),
        ));
        let target: Arc<dyn Supervised> = stream.clone();
        let health = Arc::new(HealthMonitor::new(
            config.health.clone(),
            target,
            Arc::clone(&metrics),
            notifier,
        ));
        let live = Arc::new(LiveEvaluator::new(
            Arc::clone(&cache),
            config.strategies.clone(),
            config.live.bankroll,
        ));

        Self {
            cache,
            metrics,
            stream,
            health,
            live,
            sweep_interval: (config.cache.sweep_interval_secs > 0)
                .then(|| Duration::from_secs(config.cache.sweep_interval_secs)),
            opportunities: AtomicU64::new(0),
        }
    }

    /// Wire the services against the configured WebSocket feed and alert
    /// channels. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let notifiers = build_notifier_registry(config);
        info!(notifiers = notifiers.len(), "Notifiers initialized");
        Self::build(config, websocket_factory(&config.feed.url), Arc::new(notifiers))
    }

    /// Opportunities seen since start.
    #[must_use]
    pub fn opportunities(&self) -> u64 {
        self.opportunities.load(Ordering::Relaxed)
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped), then
    /// stop every background task.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            markets = self.stream.subscriptions().len(),
            strategies = self.live.strategies().len(),
            "Starting oddsline"
        );

        self.stream.connect()?;
        self.health.spawn();

        let (stop_tx, stop_rx) = watch::channel(false);
        let reporter = self.metrics.spawn_reporter(stop_rx.clone());
        let sweeper = self.spawn_sweeper(stop_rx.clone());

        let (tx, mut results) = mpsc::channel(OPPORTUNITY_BUFFER);
        let mut evaluators = Evaluators {
            tasks: JoinSet::new(),
            markets: BTreeSet::new(),
            tx,
            stop: stop_rx.clone(),
        };
        let mut subscriptions = self.stream.watch_subscriptions();
        let markets = subscriptions.borrow_and_update().clone();
        evaluators.extend(&self.live, &markets);

        loop {
            tokio::select! {
                Some(result) = results.recv() => self.on_opportunity(&result),
                Ok(()) = subscriptions.changed() => {
                    let markets = subscriptions.borrow_and_update().clone();
                    evaluators.extend(&self.live, &markets);
                }
                () = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        stop_tx.send_replace(true);
        drop(results);
        self.health.stop().await;
        self.stream.close().await;
        while evaluators.tasks.join_next().await.is_some() {}
        let _ = reporter.await;
        if let Some(sweeper) = sweeper {
            let _ = sweeper.await;
        }

        let totals = self.metrics.snapshot().totals;
        info!(
            received = totals.received,
            processed = totals.processed,
            errors = totals.errors,
            opportunities = self.opportunities(),
            "oddsline stopped"
        );
        Ok(())
    }

    fn on_opportunity(&self, result: &StrategyResult) {
        self.opportunities.fetch_add(1, Ordering::Relaxed);
        info!(
            strategy_id = %result.strategy_id,
            strategy_type = %result.strategy_type,
            market_id = %result.market_id,
            stake = %result.recommended_stake,
            profit_potential = %result.profit_potential,
            risk = %result.risk_level,
            legs = result.selections.len(),
            "Opportunity"
        );
    }

    fn spawn_sweeper(&self, mut stop: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        let period = self.sweep_interval?;
        let cache = Arc::clone(&self.cache);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            debug!(purged, remaining = cache.len(), "Expired odds purged");
                        }
                    }
                    () = async { let _ = stop.wait_for(|stop| *stop).await; } => break,
                }
            }
        }))
    }
}
