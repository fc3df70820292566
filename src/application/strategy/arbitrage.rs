//! Arbitrage and sure-bet detection.
//!
//! Both cover every outcome of a market. Arbitrage takes the best price per
//! outcome across sources; a sure bet uses a single book. A risk-free
//! profit exists when `Σ 1/odds < 1`, and staking each outcome
//! proportionally to its implied probability equalises the payout.

use rust_decimal::Decimal;

use super::STAKE_DP;
use crate::domain::{
    ArbitrageParams, Bankroll, MarketSnapshot, OutcomeQuote, RiskLevel, Selection, StrategyId,
    StrategyResult, StrategyType,
};

/// Implied-probability sums are compared at this precision.
const SUM_DP: u32 = 12;

/// `Σ 1/odds`, rounded so exact books do not register as arbitrage.
///
/// Returns `None` if any price is not a valid decimal odd.
#[must_use]
pub fn implied_probability_sum(prices: &[Decimal]) -> Option<Decimal> {
    prices
        .iter()
        .try_fold(Decimal::ZERO, |sum, price| {
            (*price > Decimal::ONE).then(|| sum + Decimal::ONE / *price)
        })
        .map(|sum| sum.round_dp(SUM_DP))
}

/// Per-outcome stakes that pay the same amount whichever outcome wins.
#[must_use]
pub fn equal_payout_stakes(prices: &[Decimal], total_stake: Decimal, sum: Decimal) -> Vec<Decimal> {
    prices
        .iter()
        .map(|price| (total_stake * (Decimal::ONE / *price) / sum).round_dp(STAKE_DP))
        .collect()
}

pub(super) fn evaluate(
    strategy_id: &StrategyId,
    strategy_type: StrategyType,
    params: &ArbitrageParams,
    snapshot: &MarketSnapshot,
    quotes: &[&OutcomeQuote],
    bankroll: &Bankroll,
) -> Option<StrategyResult> {
    // every outcome must be priced and active
    if quotes.len() < 2 || quotes.len() != snapshot.outcome_ids().len() {
        return None;
    }

    let prices: Vec<Decimal> = quotes.iter().map(|q| q.price).collect();
    let sum = implied_probability_sum(&prices)?;
    if sum >= Decimal::ONE {
        return None;
    }
    let profit_ratio = Decimal::ONE - sum;
    if profit_ratio < params.min_profit_ratio {
        return None;
    }

    let total = params.total_stake.min(bankroll.available());
    if total <= Decimal::ZERO {
        return None;
    }

    let selections = quotes
        .iter()
        .zip(equal_payout_stakes(&prices, total, sum))
        .map(|(quote, stake)| Selection {
            outcome_id: quote.outcome_id.clone(),
            odds: quote.price,
            stake,
            probability: quote.probability,
        })
        .collect();

    Some(StrategyResult {
        strategy_id: strategy_id.clone(),
        strategy_type,
        market_id: snapshot.market_id.clone(),
        timestamp: snapshot.timestamp,
        profit_potential: profit_ratio,
        risk_level: RiskLevel::Low,
        recommended_stake: total,
        confidence: 1.0,
        selections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::domain::OddsStatus;

    fn book(source: &str, prices: &[(&str, Decimal)]) -> Vec<OutcomeQuote> {
        prices
            .iter()
            .map(|(outcome, price)| OutcomeQuote::new(*outcome, *price).with_source(source))
            .collect()
    }

    fn snapshot(quotes: Vec<OutcomeQuote>) -> MarketSnapshot {
        MarketSnapshot {
            market_id: "m1".into(),
            timestamp: Utc::now(),
            quotes,
        }
    }

    fn run(snap: &MarketSnapshot, best: bool) -> Option<StrategyResult> {
        let quotes = if best {
            snap.best_quotes()
        } else {
            snap.first_quotes()
        };
        evaluate(
            &"arb".into(),
            StrategyType::Arbitrage,
            &ArbitrageParams::default(),
            snap,
            &quotes,
            &Bankroll::new(dec!(1000)),
        )
    }

    #[test]
    fn exact_book_is_not_arbitrage() {
        let snap = snapshot(book(
            "a",
            &[("1", dec!(3.0)), ("x", dec!(3.0)), ("2", dec!(3.0))],
        ));
        assert_eq!(
            implied_probability_sum(&[dec!(3.0), dec!(3.0), dec!(3.0)]),
            Some(Decimal::ONE)
        );
        assert!(run(&snap, true).is_none());
    }

    #[test]
    fn overround_below_one_is_arbitrage() {
        let snap = snapshot(book(
            "a",
            &[("1", dec!(3.2)), ("x", dec!(3.2)), ("2", dec!(3.2))],
        ));
        let result = run(&snap, true).unwrap();

        assert_eq!(result.profit_potential, dec!(0.0625));
        assert_eq!(result.recommended_stake, dec!(100));
        assert_eq!(result.risk_level, RiskLevel::Low);
        // equal odds split the stake evenly
        for selection in &result.selections {
            assert_eq!(selection.stake, dec!(33.33));
        }
    }

    #[test]
    fn stakes_equalise_payout() {
        let prices = [dec!(2.5), dec!(2.0)];
        let sum = implied_probability_sum(&prices).unwrap();
        assert_eq!(sum, dec!(0.9));
        let stakes = equal_payout_stakes(&prices, dec!(90), sum);
        assert_eq!(stakes, vec![dec!(40), dec!(50)]);
        assert_eq!(stakes[0] * prices[0], stakes[1] * prices[1]);
    }

    #[test]
    fn profit_below_minimum_is_suppressed() {
        // Σ ≈ 0.995
        let snap = snapshot(book("a", &[("1", dec!(2.0)), ("2", dec!(2.02))]));
        assert!(run(&snap, true).is_none());
    }

    #[test]
    fn arbitrage_combines_books_but_sure_bet_does_not() {
        let mut quotes = book("a", &[("1", dec!(2.5)), ("2", dec!(1.6))]);
        quotes.extend(book("b", &[("1", dec!(1.6)), ("2", dec!(2.5))]));
        let snap = snapshot(quotes);

        let arb = run(&snap, true).unwrap();
        assert_eq!(arb.profit_potential, dec!(0.2));
        assert!(arb.selections.iter().all(|s| s.odds == dec!(2.5)));

        // book "a" alone: 0.4 + 0.625 > 1
        assert!(run(&snap, false).is_none());
    }

    #[test]
    fn inactive_outcome_blocks_detection() {
        let mut quotes = book("a", &[("1", dec!(3.2)), ("x", dec!(3.2))]);
        quotes.push(OutcomeQuote::new("2", dec!(3.2)).with_status(OddsStatus::Suspended));
        assert!(run(&snapshot(quotes), true).is_none());
    }

    #[test]
    fn single_outcome_is_not_a_market() {
        assert!(run(&snapshot(book("a", &[("1", dec!(5.0))])), true).is_none());
    }

    #[test]
    fn stake_is_limited_by_bankroll() {
        let snap = snapshot(book("a", &[("1", dec!(2.5)), ("2", dec!(2.5))]));
        let quotes = snap.best_quotes();
        let result = evaluate(
            &"arb".into(),
            StrategyType::SureBetting,
            &ArbitrageParams::default(),
            &snap,
            &quotes,
            &Bankroll::new(dec!(40)),
        )
        .unwrap();
        assert_eq!(result.recommended_stake, dec!(40));
        assert_eq!(result.strategy_type, StrategyType::SureBetting);
    }
}
