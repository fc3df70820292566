//! Value betting: back an outcome when `p × odds − 1 ≥ min_edge`.

use rust_decimal::Decimal;

use super::STAKE_DP;
use crate::domain::{
    Bankroll, MarketSnapshot, OutcomeQuote, RiskLevel, Selection, StrategyId, StrategyResult,
    StrategyType, ValueBettingParams,
};

/// Stake weighting applied at medium risk.
const MEDIUM_RISK_WEIGHT: Decimal = Decimal::from_parts(75, 0, 0, false, 2);
const CONFIDENCE: f64 = 0.75;

/// Expected value per unit stake.
#[must_use]
pub fn value_edge(probability: Decimal, odds: Decimal) -> Decimal {
    probability * odds - Decimal::ONE
}

pub(super) fn evaluate(
    strategy_id: &StrategyId,
    params: &ValueBettingParams,
    snapshot: &MarketSnapshot,
    bankroll: &Bankroll,
) -> Option<StrategyResult> {
    let (quote, probability, edge) = snapshot
        .quotes
        .iter()
        .filter(|q| q.is_usable())
        .filter_map(|q: &OutcomeQuote| {
            let p = q.probability?;
            Some((q, p, value_edge(p, q.price)))
        })
        .filter(|(_, _, edge)| *edge >= params.min_edge)
        .max_by(|a, b| a.2.cmp(&b.2))?;

    let stake =
        (bankroll.available() * params.stake_fraction * MEDIUM_RISK_WEIGHT).round_dp(STAKE_DP);
    if stake <= Decimal::ZERO {
        return None;
    }

    Some(StrategyResult {
        strategy_id: strategy_id.clone(),
        strategy_type: StrategyType::ValueBetting,
        market_id: snapshot.market_id.clone(),
        timestamp: snapshot.timestamp,
        profit_potential: edge,
        risk_level: RiskLevel::Medium,
        recommended_stake: stake,
        confidence: CONFIDENCE,
        selections: vec![Selection {
            outcome_id: quote.outcome_id.clone(),
            odds: quote.price,
            stake,
            probability: Some(probability),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::domain::OddsStatus;

    fn snapshot(quotes: Vec<OutcomeQuote>) -> MarketSnapshot {
        MarketSnapshot {
            market_id: "m1".into(),
            timestamp: Utc::now(),
            quotes,
        }
    }

    #[test]
    fn picks_highest_edge_above_threshold() {
        let snap = snapshot(vec![
            OutcomeQuote::new("home", dec!(2.2)).with_probability(dec!(0.5)),
            OutcomeQuote::new("away", dec!(4.0)).with_probability(dec!(0.3)),
        ]);
        let result = evaluate(
            &"v".into(),
            &ValueBettingParams::default(),
            &snap,
            &Bankroll::new(dec!(1000)),
        )
        .unwrap();

        // 0.3 × 4.0 − 1 = 0.2 beats 0.5 × 2.2 − 1 = 0.1
        assert_eq!(result.profit_potential, dec!(0.2));
        assert_eq!(result.selections[0].outcome_id.as_str(), "away");
        // 1000 × 0.02 × 0.75
        assert_eq!(result.recommended_stake, dec!(15));
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert!((result.confidence - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn edge_below_threshold_is_ignored() {
        let snap = snapshot(vec![
            OutcomeQuote::new("home", dec!(2.08)).with_probability(dec!(0.5)),
        ]);
        assert!(evaluate(
            &"v".into(),
            &ValueBettingParams::default(),
            &snap,
            &Bankroll::new(dec!(1000))
        )
        .is_none());
    }

    #[test]
    fn edge_at_threshold_qualifies() {
        let snap = snapshot(vec![
            OutcomeQuote::new("home", dec!(2.1)).with_probability(dec!(0.5)),
        ]);
        let result = evaluate(
            &"v".into(),
            &ValueBettingParams::default(),
            &snap,
            &Bankroll::new(dec!(1000)),
        )
        .unwrap();
        assert_eq!(result.profit_potential, dec!(0.05));
    }

    #[test]
    fn suspended_and_unpriced_outcomes_are_skipped() {
        let snap = snapshot(vec![
            OutcomeQuote::new("home", dec!(5.0))
                .with_probability(dec!(0.5))
                .with_status(OddsStatus::Suspended),
            OutcomeQuote::new("away", dec!(5.0)),
        ]);
        assert!(evaluate(
            &"v".into(),
            &ValueBettingParams::default(),
            &snap,
            &Bankroll::new(dec!(1000))
        )
        .is_none());
    }

    #[test]
    fn empty_bankroll_is_no_opportunity() {
        let snap = snapshot(vec![
            OutcomeQuote::new("home", dec!(3.0)).with_probability(dec!(0.5)),
        ]);
        assert!(evaluate(
            &"v".into(),
            &ValueBettingParams::default(),
            &snap,
            &Bankroll::new(Decimal::ZERO)
        )
        .is_none());
    }
}
