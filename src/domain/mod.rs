//! Exchange-agnostic domain types.

mod backtest;
mod bankroll;
mod health;
mod history;
mod id;
mod odds;
mod snapshot;
mod strategy;

pub use backtest::{
    max_drawdown, sharpe_ratio, BacktestBet, BacktestConfig, BacktestMetrics, BacktestResult,
    BetOutcome, DrawdownMode, EquityPoint, StakingMethod, StrategyComparison,
};
pub use bankroll::{Bankroll, SettledBet};
pub use health::{ConnectionState, HealthStatus, LatencyStats};
pub use history::{DateRange, HistoricalFilters, HistoricalOdds, MatchResult, Winner};
pub use id::{BacktestId, BetId, MarketId, OutcomeId, StrategyId};
pub use odds::{OddsStatus, OddsUpdate};
pub use snapshot::{MarketSnapshot, OutcomeQuote};
pub use strategy::{
    ArbitrageParams, KellyParams, RiskLevel, Selection, Strategy, StrategyKind, StrategyResult,
    StrategyType, ValueBettingParams,
};
