//! Aggregation of realized strategy outcomes.
//!
//! Append-only, in memory, no side effects.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{BacktestResult, RiskLevel, StrategyId, StrategyResult, StrategyType};

/// A strategy result that was acted on and settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedResult {
    pub result: StrategyResult,
    pub stake: Decimal,
    pub profit: Decimal,
    pub settled_at: DateTime<Utc>,
}

impl RealizedResult {
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.profit > Decimal::ZERO
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyPerformance {
    pub strategy_id: StrategyId,
    pub strategy_type: StrategyType,
    pub total_bets: usize,
    pub wins: usize,
    pub total_staked: Decimal,
    pub total_profit: Decimal,
    pub average_profit: Decimal,
    pub win_rate: f64,
    pub roi: f64,
    /// Rounded mean of the risk scores.
    pub risk_level: RiskLevel,
    pub max_risk: RiskLevel,
}

impl StrategyPerformance {
    fn from_results(results: &[&RealizedResult]) -> Option<Self> {
        let first = results.first()?;
        let total_bets = results.len();
        let wins = results.iter().filter(|r| r.is_win()).count();
        let total_staked: Decimal = results.iter().map(|r| r.stake).sum();
        let total_profit: Decimal = results.iter().map(|r| r.profit).sum();
        let risk_sum: u32 = results
            .iter()
            .map(|r| u32::from(r.result.risk_level.score()))
            .sum();
        let mean_risk = (f64::from(risk_sum) / total_bets as f64).round();

        Some(Self {
            strategy_id: first.result.strategy_id.clone(),
            strategy_type: first.result.strategy_type,
            total_bets,
            wins,
            total_staked,
            total_profit,
            average_profit: total_profit / Decimal::from(total_bets),
            win_rate: wins as f64 / total_bets as f64,
            roi: roi(total_profit, total_staked),
            risk_level: RiskLevel::from_score(mean_risk as u8),
            max_risk: results
                .iter()
                .map(|r| r.result.risk_level)
                .max()
                .unwrap_or(RiskLevel::Low),
        })
    }
}

fn roi(profit: Decimal, staked: Decimal) -> f64 {
    if staked.is_zero() {
        0.0
    } else {
        (profit / staked).to_f64().unwrap_or(0.0)
    }
}

/// Reporting over live and backtested results.
#[derive(Default)]
pub struct AnalyticsService {
    history: RwLock<Vec<RealizedResult>>,
}

impl AnalyticsService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, result: RealizedResult) {
        self.history.write().push(result);
    }

    /// Record every bet of a finished run. Returns how many were added.
    pub fn ingest_backtest(&self, run: &BacktestResult) -> usize {
        let realized = run.bets.iter().enumerate().map(|(i, bet)| RealizedResult {
            result: StrategyResult {
                strategy_id: run.strategy_id.clone(),
                strategy_type: bet.strategy_type,
                market_id: bet.market_id.clone(),
                timestamp: bet.placed_at,
                profit_potential: bet.profit_potential,
                risk_level: bet.risk_level,
                recommended_stake: bet.stake,
                confidence: bet.confidence,
                selections: bet.selections.clone(),
            },
            stake: bet.stake,
            profit: bet.profit,
            settled_at: run
                .equity_curve
                .get(i)
                .map_or(bet.placed_at, |point| point.timestamp),
        });
        let mut history = self.history.write();
        let before = history.len();
        history.extend(realized);
        history.len() - before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.read().is_empty()
    }

    #[must_use]
    pub fn strategy_performance(&self, strategy_id: &StrategyId) -> Option<StrategyPerformance> {
        let history = self.history.read();
        let results: Vec<&RealizedResult> = history
            .iter()
            .filter(|r| &r.result.strategy_id == strategy_id)
            .collect();
        StrategyPerformance::from_results(&results)
    }

    /// Performance of every strategy seen, ordered by id.
    #[must_use]
    pub fn all_performance(&self) -> Vec<StrategyPerformance> {
        let history = self.history.read();
        let mut by_strategy: BTreeMap<&StrategyId, Vec<&RealizedResult>> = BTreeMap::new();
        for result in history.iter() {
            by_strategy
                .entry(&result.result.strategy_id)
                .or_default()
                .push(result);
        }
        by_strategy
            .values()
            .filter_map(|results| StrategyPerformance::from_results(results))
            .collect()
    }

    /// ROI of results settled within `[from, to]`.
    #[must_use]
    pub fn roi_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
        let history = self.history.read();
        let (profit, staked) = history
            .iter()
            .filter(|r| r.settled_at >= from && r.settled_at <= to)
            .fold((Decimal::ZERO, Decimal::ZERO), |(p, s), r| {
                (p + r.profit, s + r.stake)
            });
        roi(profit, staked)
    }

    #[must_use]
    pub fn win_rate_for_kind(&self, kind: StrategyType) -> f64 {
        let history = self.history.read();
        let (wins, total) = history
            .iter()
            .filter(|r| r.result.strategy_type == kind)
            .fold((0usize, 0usize), |(w, t), r| (w + usize::from(r.is_win()), t + 1));
        if total == 0 {
            0.0
        } else {
            wins as f64 / total as f64
        }
    }
}
