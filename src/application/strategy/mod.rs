//! Stateless strategy evaluation.
//!
//! [`StrategyEngine::evaluate`] dispatches on the closed [`StrategyKind`]
//! sum type:
//!
//! - [`value`]: back the outcome whose estimated probability beats the price
//! - [`arbitrage`]: cover every outcome when implied probabilities sum below 1
//! - [`kelly`]: fractional Kelly sizing on the best positive-edge outcome
//!
//! Missing or unusable market data yields `None`, never an error.

pub mod arbitrage;
pub mod kelly;
pub mod value;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::{Bankroll, MarketSnapshot, Strategy, StrategyKind, StrategyResult};

/// Money amounts are rounded to cents.
pub(crate) const STAKE_DP: u32 = 2;

pub(crate) fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Evaluates strategies against a market snapshot and a bankroll.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyEngine;

impl StrategyEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Evaluate one strategy. `None` means no opportunity.
    #[must_use]
    pub fn evaluate(
        &self,
        strategy: &Strategy,
        snapshot: &MarketSnapshot,
        bankroll: &Bankroll,
    ) -> Option<StrategyResult> {
        match &strategy.kind {
            StrategyKind::ValueBetting(params) => {
                value::evaluate(&strategy.id, params, snapshot, bankroll)
            }
            StrategyKind::Arbitrage(params) => arbitrage::evaluate(
                &strategy.id,
                strategy.strategy_type(),
                params,
                snapshot,
                &snapshot.best_quotes(),
                bankroll,
            ),
            StrategyKind::SureBetting(params) => arbitrage::evaluate(
                &strategy.id,
                strategy.strategy_type(),
                params,
                snapshot,
                &snapshot.first_quotes(),
                bankroll,
            ),
            StrategyKind::KellyCriterion(params) => {
                kelly::evaluate(&strategy.id, params, snapshot, bankroll)
            }
        }
    }

    /// Evaluate every strategy, keeping the ones that found an opportunity.
    #[must_use]
    pub fn evaluate_all(
        &self,
        strategies: &[Strategy],
        snapshot: &MarketSnapshot,
        bankroll: &Bankroll,
    ) -> Vec<StrategyResult> {
        strategies
            .iter()
            .filter_map(|strategy| self.evaluate(strategy, snapshot, bankroll))
            .collect()
    }
}
