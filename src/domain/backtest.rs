//! Backtest configuration, per-bet records and aggregate metrics.
//!
//! The metric helpers here are pure functions over settled bets and equity
//! points so the engine and the comparison report compute them identically.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::history::{DateRange, HistoricalFilters};
use super::id::{BacktestId, BetId, MarketId, StrategyId};
use super::strategy::{RiskLevel, Selection, StrategyType};
use crate::error::BacktestError;

/// How the stake of each replayed bet is sized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum StakingMethod {
    /// Fixed fraction of the initial bankroll.
    Fixed { fraction: Decimal },
    /// Fraction of the current available bankroll.
    Percentage { fraction: Decimal },
    /// Kelly fraction of the current bankroll scaled by `multiplier`.
    Kelly { multiplier: Decimal },
}

impl Default for StakingMethod {
    fn default() -> Self {
        Self::Fixed {
            fraction: Decimal::new(2, 2),
        }
    }
}

/// Whether drawdown is reported in currency or as a ratio of the peak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawdownMode {
    #[default]
    Absolute,
    Ratio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub date_range: DateRange,
    #[serde(default)]
    pub filters: HistoricalFilters,
    #[serde(default)]
    pub staking: StakingMethod,
    pub initial_bankroll: Decimal,
    #[serde(default)]
    pub drawdown_mode: DrawdownMode,
}

impl BacktestConfig {
    pub fn new(date_range: DateRange, initial_bankroll: Decimal) -> Self {
        Self {
            date_range,
            filters: HistoricalFilters::default(),
            staking: StakingMethod::default(),
            initial_bankroll,
            drawdown_mode: DrawdownMode::default(),
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: HistoricalFilters) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn with_staking(mut self, staking: StakingMethod) -> Self {
        self.staking = staking;
        self
    }

    #[must_use]
    pub fn with_drawdown_mode(mut self, mode: DrawdownMode) -> Self {
        self.drawdown_mode = mode;
        self
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.date_range.start > self.date_range.end {
            return Err(BacktestError::InvalidConfig(format!(
                "date range start {} is after end {}",
                self.date_range.start, self.date_range.end
            )));
        }
        if self.initial_bankroll <= Decimal::ZERO {
            return Err(BacktestError::InvalidConfig(
                "initial bankroll must be positive".into(),
            ));
        }
        let factor = match self.staking {
            StakingMethod::Fixed { fraction } | StakingMethod::Percentage { fraction } => fraction,
            StakingMethod::Kelly { multiplier } => multiplier,
        };
        if factor <= Decimal::ZERO || factor > Decimal::ONE {
            return Err(BacktestError::InvalidConfig(format!(
                "staking factor {factor} must be in (0, 1]"
            )));
        }
        if let (Some(min), Some(max)) = (self.filters.min_odds, self.filters.max_odds) {
            if min > max {
                return Err(BacktestError::InvalidConfig(format!(
                    "min_odds {min} exceeds max_odds {max}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetOutcome {
    Won,
    Lost,
}

/// One replayed and settled bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestBet {
    pub id: BetId,
    pub market_id: MarketId,
    pub strategy_type: StrategyType,
    pub placed_at: DateTime<Utc>,
    pub risk_level: RiskLevel,
    /// Expected profit per unit staked, as evaluated.
    pub profit_potential: Decimal,
    pub confidence: f64,
    pub selections: Vec<Selection>,
    pub stake: Decimal,
    /// Payout if winning divided by total stake.
    pub odds: Decimal,
    pub outcome: BetOutcome,
    pub profit: Decimal,
    pub bankroll_after: Decimal,
}

impl BacktestBet {
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.outcome == BetOutcome::Won
    }

    /// Profit per unit staked.
    #[must_use]
    pub fn return_ratio(&self) -> f64 {
        if self.stake.is_zero() {
            return 0.0;
        }
        (self.profit / self.stake).to_f64().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub win_rate: f64,
    pub roi: f64,
    pub total_profit: Decimal,
    pub total_staked: Decimal,
    pub sharpe_ratio: f64,
    pub max_drawdown: Decimal,
    pub avg_odds: Decimal,
    pub bet_count: usize,
    pub final_equity: Decimal,
}

impl BacktestMetrics {
    /// Aggregate a finished run.
    #[must_use]
    pub fn compute(
        bets: &[BacktestBet],
        initial_bankroll: Decimal,
        equity_curve: &[EquityPoint],
        mode: DrawdownMode,
    ) -> Self {
        let bet_count = bets.len();
        let wins = bets.iter().filter(|b| b.is_win()).count();
        let total_profit: Decimal = bets.iter().map(|b| b.profit).sum();
        let total_staked: Decimal = bets.iter().map(|b| b.stake).sum();
        let odds_sum: Decimal = bets.iter().map(|b| b.odds).sum();
        let returns: Vec<f64> = bets.iter().map(BacktestBet::return_ratio).collect();
        let equities = std::iter::once(initial_bankroll).chain(equity_curve.iter().map(|p| p.equity));

        Self {
            win_rate: ratio(wins, bet_count),
            roi: decimal_ratio(total_profit, total_staked),
            total_profit,
            total_staked,
            sharpe_ratio: sharpe_ratio(&returns),
            max_drawdown: max_drawdown(equities, mode),
            avg_odds: if bet_count == 0 {
                Decimal::ZERO
            } else {
                odds_sum / Decimal::from(bet_count)
            },
            bet_count,
            final_equity: equity_curve
                .last()
                .map_or(initial_bankroll, |point| point.equity),
        }
    }
}

/// Largest decline from a running peak to a later trough.
///
/// The first value seeds the peak. In [`DrawdownMode::Ratio`] each decline is
/// divided by the peak it fell from.
pub fn max_drawdown(equities: impl IntoIterator<Item = Decimal>, mode: DrawdownMode) -> Decimal {
    let mut peak: Option<Decimal> = None;
    let mut worst = Decimal::ZERO;
    for equity in equities {
        let current_peak = match peak {
            Some(p) if p >= equity => p,
            _ => {
                peak = Some(equity);
                equity
            }
        };
        let decline = current_peak - equity;
        let drawdown = match mode {
            DrawdownMode::Absolute => decline,
            DrawdownMode::Ratio if current_peak > Decimal::ZERO => decline / current_peak,
            DrawdownMode::Ratio => Decimal::ZERO,
        };
        if drawdown > worst {
            worst = drawdown;
        }
    }
    worst
}

/// Mean over population standard deviation of per-bet returns.
///
/// Zero with fewer than two returns or no dispersion.
#[must_use]
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let first = returns[0];
    if returns.iter().all(|r| (r - first).abs() <= f64::EPSILON * first.abs().max(1.0)) {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    // The mean of identical returns carries rounding residue.
    if stddev <= f64::EPSILON * mean.abs().max(1.0) || !stddev.is_finite() {
        0.0
    } else {
        mean / stddev
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn decimal_ratio(num: Decimal, den: Decimal) -> f64 {
    if den.is_zero() {
        0.0
    } else {
        (num / den).to_f64().unwrap_or(0.0)
    }
}

/// Immutable record of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub id: BacktestId,
    pub strategy_id: StrategyId,
    pub config: BacktestConfig,
    pub metrics: BacktestMetrics,
    pub bets: Vec<BacktestBet>,
    pub equity_curve: Vec<EquityPoint>,
    pub created_at: DateTime<Utc>,
}

/// Metrics aggregated over every persisted run of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub strategy_id: StrategyId,
    pub runs: usize,
    pub bet_count: usize,
    pub win_rate: f64,
    pub roi: f64,
    pub total_profit: Decimal,
    pub avg_sharpe: f64,
    pub max_drawdown: Decimal,
    /// Mean of `final_equity / initial_bankroll − 1` across runs.
    pub avg_return: f64,
}

impl StrategyComparison {
    #[must_use]
    pub fn aggregate(strategy_id: StrategyId, runs: &[BacktestResult]) -> Self {
        let bets: Vec<&BacktestBet> = runs.iter().flat_map(|r| r.bets.iter()).collect();
        let wins = bets.iter().filter(|b| b.is_win()).count();
        let total_profit: Decimal = bets.iter().map(|b| b.profit).sum();
        let total_staked: Decimal = bets.iter().map(|b| b.stake).sum();
        let avg_sharpe = if runs.is_empty() {
            0.0
        } else {
            runs.iter().map(|r| r.metrics.sharpe_ratio).sum::<f64>() / runs.len() as f64
        };
        let avg_return = if runs.is_empty() {
            0.0
        } else {
            runs.iter()
                .map(|r| decimal_ratio(r.metrics.final_equity, r.config.initial_bankroll) - 1.0)
                .sum::<f64>()
                / runs.len() as f64
        };

        Self {
            strategy_id,
            runs: runs.len(),
            bet_count: bets.len(),
            win_rate: ratio(wins, bets.len()),
            roi: decimal_ratio(total_profit, total_staked),
            total_profit,
            avg_sharpe,
            max_drawdown: runs
                .iter()
                .map(|r| r.metrics.max_drawdown)
                .max()
                .unwrap_or(Decimal::ZERO),
            avg_return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn drawdown_peak_to_trough() {
        let curve = [dec!(1000), dec!(1200), dec!(900), dec!(1100)];
        assert_eq!(max_drawdown(curve, DrawdownMode::Absolute), dec!(300));
        assert_eq!(max_drawdown(curve, DrawdownMode::Ratio), dec!(0.25));
    }

    #[test]
    fn drawdown_of_rising_curve_is_zero() {
        let curve = [dec!(100), dec!(110), dec!(120)];
        assert_eq!(max_drawdown(curve, DrawdownMode::Absolute), Decimal::ZERO);
    }

    #[test]
    fn sharpe_needs_two_returns_and_dispersion() {
        assert_eq!(sharpe_ratio(&[0.5]), 0.0);
        assert_eq!(sharpe_ratio(&[0.2, 0.2, 0.2]), 0.0);
        assert_eq!(sharpe_ratio(&[0.1; 3]), 0.0);
        assert_eq!(sharpe_ratio(&[-0.35; 7]), 0.0);
        let sharpe = sharpe_ratio(&[1.0, -1.0, 1.0, 1.0]);
        // mean 0.5, population stddev sqrt(0.75)
        assert!((sharpe - 0.5 / 0.75_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_inverted_range_and_bad_factor() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let config = BacktestConfig::new(DateRange::new(day(5), day(1)), dec!(1000));
        assert!(config.validate().is_err());

        let config = BacktestConfig::new(DateRange::new(day(1), day(5)), dec!(1000))
            .with_staking(StakingMethod::Percentage { fraction: dec!(1.5) });
        assert!(config.validate().is_err());

        let config = BacktestConfig::new(DateRange::new(day(1), day(5)), dec!(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn staking_method_toml_shape() {
        let staking: StakingMethod = toml::from_str("method = \"kelly\"\nmultiplier = 0.5").unwrap();
        assert_eq!(staking, StakingMethod::Kelly { multiplier: dec!(0.5) });
    }
}
