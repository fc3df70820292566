//! Fractional Kelly sizing.

use rust_decimal::Decimal;

use super::{to_f64, STAKE_DP};
use crate::domain::{
    Bankroll, KellyParams, MarketSnapshot, RiskLevel, Selection, StrategyId, StrategyResult,
    StrategyType,
};

/// Raw Kelly fraction `f* = (b·p − q) / b` with `b = odds − 1`.
///
/// `None` for odds that cannot pay out or probabilities outside `(0, 1)`.
#[must_use]
pub fn kelly_fraction(probability: Decimal, odds: Decimal) -> Option<Decimal> {
    if odds <= Decimal::ONE || probability <= Decimal::ZERO || probability >= Decimal::ONE {
        return None;
    }
    let b = odds - Decimal::ONE;
    let q = Decimal::ONE - probability;
    Some((b * probability - q) / b)
}

/// `available × f* × fraction`, rounded to cents.
#[must_use]
pub fn kelly_stake(available: Decimal, raw_fraction: Decimal, multiplier: Decimal) -> Decimal {
    (available * raw_fraction * multiplier).round_dp(STAKE_DP)
}

fn confidence(edge: Decimal) -> f64 {
    (to_f64(edge) * 5.0).clamp(0.1, 1.0)
}

pub(super) fn evaluate(
    strategy_id: &StrategyId,
    params: &KellyParams,
    snapshot: &MarketSnapshot,
    bankroll: &Bankroll,
) -> Option<StrategyResult> {
    let (quote, probability, fraction) = snapshot
        .quotes
        .iter()
        .filter(|q| q.is_usable())
        .filter_map(|q| {
            let p = q.probability?;
            Some((q, p, kelly_fraction(p, q.price)?))
        })
        .filter(|(_, _, f)| *f > Decimal::ZERO)
        .max_by(|a, b| a.2.cmp(&b.2))?;

    let stake = kelly_stake(bankroll.available(), fraction, params.fraction);
    if stake <= Decimal::ZERO {
        return None;
    }
    let edge = probability * quote.price - Decimal::ONE;

    Some(StrategyResult {
        strategy_id: strategy_id.clone(),
        strategy_type: StrategyType::KellyCriterion,
        market_id: snapshot.market_id.clone(),
        timestamp: snapshot.timestamp,
        profit_potential: edge,
        risk_level: RiskLevel::from_kelly_fraction(fraction),
        recommended_stake: stake,
        confidence: confidence(edge),
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

    use crate::domain::OutcomeQuote;

    fn snapshot(quotes: Vec<OutcomeQuote>) -> MarketSnapshot {
        MarketSnapshot {
            market_id: "m1".into(),
            timestamp: Utc::now(),
            quotes,
        }
    }

    #[test]
    fn even_odds_sixty_percent() {
        let snap = snapshot(vec![
            OutcomeQuote::new("home", dec!(2.0)).with_probability(dec!(0.6)),
        ]);
        let result = evaluate(
            &"k".into(),
            &KellyParams::default(),
            &snap,
            &Bankroll::new(dec!(1000)),
        )
        .unwrap();

        assert_eq!(kelly_fraction(dec!(0.6), dec!(2.0)), Some(dec!(0.2)));
        assert_eq!(result.recommended_stake, dec!(50));
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.profit_potential, dec!(0.2));
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_edge_is_no_opportunity() {
        let snap = snapshot(vec![
            OutcomeQuote::new("home", dec!(1.8)).with_probability(dec!(0.5)),
        ]);
        assert!(evaluate(
            &"k".into(),
            &KellyParams::default(),
            &snap,
            &Bankroll::new(dec!(1000))
        )
        .is_none());
    }

    #[test]
    fn confidence_is_clamped() {
        // edge 0.01 × 5 = 0.05 → 0.1
        assert!((confidence(dec!(0.01)) - 0.1).abs() < f64::EPSILON);
        assert!((confidence(dec!(0.1)) - 0.5).abs() < 1e-12);
        assert!((confidence(dec!(2)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn picks_largest_fraction() {
        let snap = snapshot(vec![
            OutcomeQuote::new("home", dec!(2.0)).with_probability(dec!(0.55)),
            OutcomeQuote::new("away", dec!(3.0)).with_probability(dec!(0.45)),
        ]);
        let result = evaluate(
            &"k".into(),
            &KellyParams::default(),
            &snap,
            &Bankroll::new(dec!(1000)),
        )
        .unwrap();
        // home f* = 0.1, away f* = (2 × 0.45 − 0.55) / 2 = 0.175
        assert_eq!(result.selections[0].outcome_id.as_str(), "away");
        assert_eq!(result.recommended_stake, dec!(43.75));
        assert_eq!(result.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn invalid_inputs_have_no_fraction() {
        assert_eq!(kelly_fraction(dec!(1), dec!(2)), None);
        assert_eq!(kelly_fraction(dec!(0.5), dec!(1)), None);
    }

    #[test]
    fn tiny_bankroll_rounds_to_zero() {
        let snap = snapshot(vec![
            OutcomeQuote::new("home", dec!(2.0)).with_probability(dec!(0.6)),
        ]);
        assert!(evaluate(
            &"k".into(),
            &KellyParams::default(),
            &snap,
            &Bankroll::new(dec!(0.05))
        )
        .is_none());
    }
}
