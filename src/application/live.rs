//! Live strategy evaluation against the odds cache.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::application::cache::OddsCache;
use crate::application::strategy::StrategyEngine;
use crate::domain::{Bankroll, MarketId, MarketSnapshot, OutcomeId, Strategy, StrategyResult};
use crate::error::Result;
use crate::port::ExchangeClient;

/// Re-evaluates configured strategies whenever a market ticks.
///
/// Owns its own [`Bankroll`]; probability estimates come from the caller.
pub struct LiveEvaluator {
    cache: Arc<OddsCache>,
    engine: StrategyEngine,
    strategies: Vec<Strategy>,
    bankroll: RwLock<Bankroll>,
    probabilities: DashMap<(MarketId, OutcomeId), Decimal>,
}

impl LiveEvaluator {
    pub fn new(cache: Arc<OddsCache>, strategies: Vec<Strategy>, initial_bankroll: Decimal) -> Self {
        Self {
            cache,
            engine: StrategyEngine::new(),
            strategies,
            bankroll: RwLock::new(Bankroll::new(initial_bankroll)),
            probabilities: DashMap::new(),
        }
    }

    /// Record an estimated win probability for one outcome.
    pub fn set_probability(&self, market_id: MarketId, outcome_id: OutcomeId, probability: Decimal) {
        self.probabilities
            .insert((market_id, outcome_id), probability);
    }

    #[must_use]
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    #[must_use]
    pub fn bankroll(&self) -> Bankroll {
        self.bankroll.read().clone()
    }

    /// Evaluate every strategy against the cached prices for a market.
    #[must_use]
    pub fn evaluate_market(&self, market_id: &MarketId) -> Vec<StrategyResult> {
        match self.cache.market_snapshot(market_id) {
            Some(snapshot) => self.evaluate_snapshot(snapshot),
            None => {
                debug!(market_id = %market_id, "No fresh prices for market");
                Vec::new()
            }
        }
    }

    /// Attach known probabilities and evaluate.
    #[must_use]
    pub fn evaluate_snapshot(&self, mut snapshot: MarketSnapshot) -> Vec<StrategyResult> {
        for quote in &mut snapshot.quotes {
            if quote.probability.is_none() {
                let key = (snapshot.market_id.clone(), quote.outcome_id.clone());
                quote.probability = self.probabilities.get(&key).map(|p| *p);
            }
        }
        let bankroll = self.bankroll.read();
        self.engine
            .evaluate_all(&self.strategies, &snapshot, &bankroll)
    }

    /// Set the bankroll from the exchange balance.
    pub async fn refresh_bankroll(&self, exchange: &dyn ExchangeClient) -> Result<Decimal> {
        let balance = exchange.get_balance().await?;
        self.bankroll.write().reset_balance(balance);
        info!(balance = %balance, "Bankroll refreshed");
        Ok(balance)
    }

    /// Evaluate `market_id` on every tick and forward results to `tx`.
    ///
    /// Returns when `shutdown` flips, the receiver is dropped, or the market
    /// topic closes.
    pub async fn run(
        &self,
        market_id: MarketId,
        tx: mpsc::Sender<StrategyResult>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticks = self.cache.subscribe(&market_id);
        loop {
            tokio::select! {
                tick = ticks.recv() => match tick {
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(market_id = %market_id, skipped, "Evaluator lagging behind feed");
                    }
                    Err(RecvError::Closed) => return,
                },
                () = async { let _ = shutdown.wait_for(|stop| *stop).await; } => return,
            }

            for result in self.evaluate_market(&market_id) {
                debug!(
                    strategy_id = %result.strategy_id,
                    market_id = %result.market_id,
                    stake = %result.recommended_stake,
                    "Opportunity found"
                );
                if tx.send(result).await.is_err() {
                    return;
                }
            }
        }
    }
}
