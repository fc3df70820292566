//! Strategy definitions and evaluation results.
//!
//! A [`Strategy`] is an immutable pairing of an id with a [`StrategyKind`].
//! Each kind carries its own parameter struct so evaluation can match
//! exhaustively; there is no "unknown strategy" at runtime.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{MarketId, OutcomeId, StrategyId};

/// Value betting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBettingParams {
    /// Minimum expected value (`p × odds − 1`) to flag a value bet.
    #[serde(default = "default_min_edge")]
    pub min_edge: Decimal,
    /// Share of available bankroll staked before confidence weighting.
    #[serde(default = "default_stake_fraction")]
    pub stake_fraction: Decimal,
}

fn default_min_edge() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_stake_fraction() -> Decimal {
    Decimal::new(2, 2) // 0.02
}

impl Default for ValueBettingParams {
    fn default() -> Self {
        Self {
            min_edge: default_min_edge(),
            stake_fraction: default_stake_fraction(),
        }
    }
}

/// Arbitrage and sure-bet parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageParams {
    /// Minimum guaranteed profit per unit staked.
    #[serde(default = "default_min_profit_ratio")]
    pub min_profit_ratio: Decimal,
    /// Total stake to distribute across all outcomes.
    #[serde(default = "default_total_stake")]
    pub total_stake: Decimal,
}

fn default_min_profit_ratio() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_total_stake() -> Decimal {
    Decimal::new(100, 0)
}

impl Default for ArbitrageParams {
    fn default() -> Self {
        Self {
            min_profit_ratio: default_min_profit_ratio(),
            total_stake: default_total_stake(),
        }
    }
}

/// Kelly criterion parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KellyParams {
    /// Multiplier applied to the raw Kelly fraction.
    #[serde(default = "default_kelly_fraction")]
    pub fraction: Decimal,
}

fn default_kelly_fraction() -> Decimal {
    Decimal::new(25, 2) // 0.25
}

impl Default for KellyParams {
    fn default() -> Self {
        Self {
            fraction: default_kelly_fraction(),
        }
    }
}

/// Closed set of strategy kinds with their parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    ValueBetting(ValueBettingParams),
    /// Best price per outcome across all sources.
    Arbitrage(ArbitrageParams),
    /// All legs priced from a single book.
    SureBetting(ArbitrageParams),
    KellyCriterion(KellyParams),
}

impl StrategyKind {
    #[must_use]
    pub const fn strategy_type(&self) -> StrategyType {
        match self {
            Self::ValueBetting(_) => StrategyType::ValueBetting,
            Self::Arbitrage(_) => StrategyType::Arbitrage,
            Self::SureBetting(_) => StrategyType::SureBetting,
            Self::KellyCriterion(_) => StrategyType::KellyCriterion,
        }
    }
}

/// Parameterless discriminant of [`StrategyKind`], used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyType {
    ValueBetting,
    Arbitrage,
    SureBetting,
    KellyCriterion,
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ValueBetting => "VALUE_BETTING",
            Self::Arbitrage => "ARBITRAGE",
            Self::SureBetting => "SURE_BETTING",
            Self::KellyCriterion => "KELLY_CRITERION",
        };
        f.write_str(s)
    }
}

/// A configured strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: StrategyId,
    #[serde(flatten)]
    pub kind: StrategyKind,
}

impl Strategy {
    pub fn new(id: impl Into<StrategyId>, kind: StrategyKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    #[must_use]
    pub const fn strategy_type(&self) -> StrategyType {
        self.kind.strategy_type()
    }
}

/// Risk classification attached to every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Numeric score used when averaging risk (LOW=1, MEDIUM=2, HIGH=3).
    #[must_use]
    pub const fn score(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Inverse of [`score`](Self::score), clamping out-of-range values.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            0 | 1 => Self::Low,
            2 => Self::Medium,
            _ => Self::High,
        }
    }

    /// Kelly tier: f* ≤ 0.1 LOW, ≤ 0.2 MEDIUM, otherwise HIGH.
    #[must_use]
    pub fn from_kelly_fraction(fraction: Decimal) -> Self {
        if fraction <= Decimal::new(1, 1) {
            Self::Low
        } else if fraction <= Decimal::new(2, 1) {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        };
        f.write_str(s)
    }
}

/// One outcome to back as part of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub outcome_id: OutcomeId,
    pub odds: Decimal,
    pub stake: Decimal,
    #[serde(default)]
    pub probability: Option<Decimal>,
}

/// Output of a successful strategy evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub strategy_id: StrategyId,
    pub strategy_type: StrategyType,
    pub market_id: MarketId,
    pub timestamp: DateTime<Utc>,
    /// Expected profit per unit staked.
    pub profit_potential: Decimal,
    pub risk_level: RiskLevel,
    pub recommended_stake: Decimal,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub selections: Vec<Selection>,
}

impl StrategyResult {
    /// The selection with the largest stake.
    #[must_use]
    pub fn primary_selection(&self) -> Option<&Selection> {
        self.selections.iter().max_by(|a, b| a.stake.cmp(&b.stake))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn kelly_risk_tiers() {
        assert_eq!(RiskLevel::from_kelly_fraction(dec!(0.1)), RiskLevel::Low);
        assert_eq!(RiskLevel::from_kelly_fraction(dec!(0.2)), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_kelly_fraction(dec!(0.21)), RiskLevel::High);
    }

    #[test]
    fn risk_scores_round_trip() {
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            assert_eq!(RiskLevel::from_score(level.score()), level);
        }
        assert_eq!(RiskLevel::from_score(9), RiskLevel::High);
    }

    #[test]
    fn strategy_deserializes_from_flat_toml() {
        let strategy: Strategy = toml::from_str(
            r#"
            id = "kelly-main"
            kind = "KELLY_CRITERION"
            fraction = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(strategy.id.as_str(), "kelly-main");
        assert_eq!(
            strategy.kind,
            StrategyKind::KellyCriterion(KellyParams {
                fraction: dec!(0.5)
            })
        );
    }

    #[test]
    fn missing_params_use_defaults() {
        let strategy: Strategy = toml::from_str(
            r#"
            id = "arb"
            kind = "ARBITRAGE"
            "#,
        )
        .unwrap();
        assert_eq!(strategy.kind, StrategyKind::Arbitrage(ArbitrageParams::default()));
        assert_eq!(strategy.strategy_type(), StrategyType::Arbitrage);
    }
}
