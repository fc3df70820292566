//! Deterministic historical replay.
//!
//! [`replay`] is a pure function of the strategy, the run config and the
//! ordered events; [`BacktestEngine`] loads the events, stamps the run with
//! an id and persists it.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::application::strategy::kelly::kelly_fraction;
use crate::application::strategy::{StrategyEngine, STAKE_DP};
use crate::domain::{
    BacktestBet, BacktestConfig, BacktestId, BacktestMetrics, BacktestResult, Bankroll, BetId,
    BetOutcome, EquityPoint, HistoricalOdds, MatchResult, Selection, SettledBet, StakingMethod,
    Strategy, StrategyComparison, StrategyId, StrategyResult, Winner,
};
use crate::error::{BacktestError, Result};
use crate::port::{BacktestStore, HistoricalDataSource};

/// Effective odds are kept to four decimal places.
const ODDS_DP: u32 = 4;

/// One historical event and its settlement, if known.
#[derive(Debug, Clone)]
pub struct ReplayEvent {
    pub odds: HistoricalOdds,
    pub result: Option<MatchResult>,
}

/// Output of a replay before it is stamped and persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    pub bets: Vec<BacktestBet>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: BacktestMetrics,
}

/// Size a bet according to the configured staking method.
#[must_use]
pub fn size_stake(
    staking: StakingMethod,
    result: &StrategyResult,
    bankroll: &Bankroll,
    initial_bankroll: Decimal,
) -> Decimal {
    let stake = match staking {
        StakingMethod::Fixed { fraction } => initial_bankroll * fraction,
        StakingMethod::Percentage { fraction } => bankroll.available() * fraction,
        StakingMethod::Kelly { multiplier } => {
            let selection = result.primary_selection();
            match selection.and_then(|s| Some((s.probability?, s.odds))) {
                Some((probability, odds)) => kelly_fraction(probability, odds)
                    .filter(|f| *f > Decimal::ZERO)
                    .map_or(Decimal::ZERO, |f| bankroll.available() * f * multiplier),
                None => result.recommended_stake,
            }
        }
    };
    stake.round_dp(STAKE_DP)
}

/// Settled legs of one bet.
struct Settlement {
    selections: Vec<Selection>,
    odds: Decimal,
    outcome: BetOutcome,
    profit: Decimal,
}

/// Split `stake` across the result's selections in proportion to their
/// recommended stakes and settle each leg against `winner`.
fn settle(result: &StrategyResult, stake: Decimal, winner: Winner) -> Option<Settlement> {
    let weight: Decimal = result.selections.iter().map(|s| s.stake).sum();
    if weight <= Decimal::ZERO {
        return None;
    }

    let mut payout = Decimal::ZERO;
    let mut best_payout = Decimal::ZERO;
    let mut won = false;
    let mut selections = Vec::with_capacity(result.selections.len());
    for selection in &result.selections {
        let leg_stake = stake * selection.stake / weight;
        let leg_payout = leg_stake * selection.odds;
        best_payout = best_payout.max(leg_payout);
        if winner.pays(&selection.outcome_id) {
            payout += leg_payout;
            won = true;
        }
        selections.push(Selection {
            stake: leg_stake.round_dp(STAKE_DP),
            ..selection.clone()
        });
    }

    Some(Settlement {
        selections,
        odds: (best_payout / stake).round_dp(ODDS_DP),
        outcome: if won { BetOutcome::Won } else { BetOutcome::Lost },
        profit: (payout - stake).round_dp(STAKE_DP),
    })
}

/// Replay `events` in order against a fresh bankroll.
#[must_use]
pub fn replay(
    engine: &StrategyEngine,
    strategy: &Strategy,
    config: &BacktestConfig,
    events: &[ReplayEvent],
) -> Replay {
    let mut bankroll = Bankroll::new(config.initial_bankroll);
    let mut bets = Vec::new();
    let mut equity_curve = Vec::new();

    for event in events {
        let market_id = event.odds.market_id();
        let Some(winner) = event.result.as_ref().and_then(MatchResult::outcome) else {
            debug!(market_id = %market_id, "No settlement recorded, skipping event");
            continue;
        };

        let snapshot = event.odds.to_snapshot();
        let Some(result) = engine.evaluate(strategy, &snapshot, &bankroll) else {
            continue;
        };

        let stake = size_stake(config.staking, &result, &bankroll, config.initial_bankroll);
        if !bankroll.can_cover(stake) {
            debug!(
                market_id = %market_id,
                stake = %stake,
                available = %bankroll.available(),
                "Stake not covered, skipping"
            );
            continue;
        }

        let Some(settlement) = settle(&result, stake, winner) else {
            continue;
        };

        bankroll.settle(SettledBet {
            stake,
            profit: settlement.profit,
            odds: settlement.odds,
            settled_at: event.odds.match_date,
        });
        equity_curve.push(EquityPoint {
            timestamp: event.odds.match_date,
            equity: bankroll.available(),
        });
        bets.push(BacktestBet {
            id: BetId::sequence(bets.len() + 1),
            market_id,
            strategy_type: result.strategy_type,
            placed_at: result.timestamp,
            risk_level: result.risk_level,
            profit_potential: result.profit_potential,
            confidence: result.confidence,
            selections: settlement.selections,
            stake,
            odds: settlement.odds,
            outcome: settlement.outcome,
            profit: settlement.profit,
            bankroll_after: bankroll.available(),
        });
    }

    let metrics = BacktestMetrics::compute(
        &bets,
        config.initial_bankroll,
        &equity_curve,
        config.drawdown_mode,
    );
    Replay {
        bets,
        equity_curve,
        metrics,
    }
}

/// Runs, persists and compares backtests.
pub struct BacktestEngine {
    history: Arc<dyn HistoricalDataSource>,
    store: Arc<dyn BacktestStore>,
    engine: StrategyEngine,
}

impl BacktestEngine {
    pub fn new(history: Arc<dyn HistoricalDataSource>, store: Arc<dyn BacktestStore>) -> Self {
        Self {
            history,
            store,
            engine: StrategyEngine::new(),
        }
    }

    /// Replay `strategy` over the configured history and persist the run.
    ///
    /// # Errors
    /// Fails on an invalid config, when no historical odds match, or when the
    /// data source or store fails. Nothing is persisted on failure.
    pub async fn run_backtest(
        &self,
        strategy: &Strategy,
        config: BacktestConfig,
    ) -> Result<BacktestResult> {
        config.validate()?;

        let mut odds = self
            .history
            .historical_odds(&config.filters, &config.date_range)
            .await?;
        if odds.is_empty() {
            return Err(BacktestError::NoData {
                sports: config.filters.sports.clone(),
                leagues: config.filters.leagues.clone(),
                from: config.date_range.start,
                to: config.date_range.end,
            }
            .into());
        }

        odds.sort_by(|a, b| {
            a.match_date
                .cmp(&b.match_date)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });

        let mut events = Vec::with_capacity(odds.len());
        for odds in odds {
            let result = self
                .history
                .match_result(&odds.sport, &odds.home_team, &odds.away_team, odds.match_date)
                .await?;
            events.push(ReplayEvent { odds, result });
        }

        let Replay {
            bets,
            equity_curve,
            metrics,
        } = replay(&self.engine, strategy, &config, &events);

        let result = BacktestResult {
            id: BacktestId::generate(),
            strategy_id: strategy.id.clone(),
            config,
            metrics,
            bets,
            equity_curve,
            created_at: Utc::now(),
        };
        self.store.save(&result).await?;

        info!(
            backtest_id = %result.id,
            strategy_id = %result.strategy_id,
            events = events.len(),
            bets = result.metrics.bet_count,
            roi = result.metrics.roi,
            "Backtest complete"
        );
        Ok(result)
    }

    /// Aggregate persisted runs per strategy, in the order given.
    /// Strategies without runs are left out.
    pub async fn compare_strategies(
        &self,
        strategy_ids: &[StrategyId],
    ) -> Result<Vec<StrategyComparison>> {
        let mut comparisons = Vec::with_capacity(strategy_ids.len());
        for id in strategy_ids {
            let runs = self.store.list_by_strategy(id).await?;
            if runs.is_empty() {
                debug!(strategy_id = %id, "No persisted runs");
                continue;
            }
            comparisons.push(StrategyComparison::aggregate(id.clone(), &runs));
        }
        Ok(comparisons)
    }

    pub async fn get_result(&self, id: &BacktestId) -> Result<Option<BacktestResult>> {
        self.store.get(id).await
    }

    /// Persisted runs, oldest first, optionally for one strategy.
    pub async fn list_results(
        &self,
        strategy_id: Option<&StrategyId>,
    ) -> Result<Vec<BacktestResult>> {
        match strategy_id {
            Some(id) => self.store.list_by_strategy(id).await,
            None => self.store.list().await,
        }
    }
}
