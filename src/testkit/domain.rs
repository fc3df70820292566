//! Builders for domain values used across tests.
//!
//! Timestamps are whole seconds and metric inputs are chosen so that every
//! float survives a JSON round trip unchanged.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    BacktestBet, BacktestConfig, BacktestId, BacktestMetrics, BacktestResult, BetId, BetOutcome,
    DateRange, EquityPoint, HistoricalOdds, MarketId, MatchResult, OddsStatus, OddsUpdate,
    OutcomeId, RiskLevel, Selection, StrategyId, StrategyResult, StrategyType, Winner,
};

fn kickoff(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(15, 0, 0).expect("valid kickoff time");
    Utc.from_utc_datetime(&naive)
}

fn decimal(literal: &str) -> Decimal {
    Decimal::from_str(literal).expect("decimal literal")
}

/// An active update for one outcome.
pub fn odds_update(
    market: &str,
    outcome: &str,
    price: Decimal,
    observed_at: DateTime<Utc>,
) -> OddsUpdate {
    OddsUpdate {
        market_id: MarketId::from(market),
        outcome_id: OutcomeId::from(outcome),
        price,
        observed_at,
        status: OddsStatus::Active,
    }
}

/// Soccer fixture odds kicking off at 15:00 UTC on `date`, captured two
/// hours earlier.
pub fn historical_odds(
    home: &str,
    away: &str,
    date: NaiveDate,
    prices: &[(&str, &str)],
) -> HistoricalOdds {
    let match_date = kickoff(date);
    HistoricalOdds {
        sport: "soccer".into(),
        league: Some("premier-league".into()),
        market: "MATCH_WINNER".into(),
        home_team: home.into(),
        away_team: away.into(),
        match_date,
        bookmaker: "pinnacle".into(),
        odds: prices
            .iter()
            .map(|(outcome, price)| ((*outcome).to_string(), decimal(price)))
            .collect(),
        probabilities: BTreeMap::new(),
        timestamp: match_date - Duration::hours(2),
    }
}

/// Settled result for the fixture built by [`historical_odds`].
pub fn match_result(home: &str, away: &str, date: NaiveDate, winner: Winner) -> MatchResult {
    MatchResult {
        sport: "soccer".into(),
        home_team: home.into(),
        away_team: away.into(),
        match_date: kickoff(date),
        home_score: None,
        away_score: None,
        winner: Some(winner),
    }
}

/// A single-selection result on market `m1`.
pub fn strategy_result(strategy: &str, kind: StrategyType) -> StrategyResult {
    StrategyResult {
        strategy_id: StrategyId::from(strategy),
        strategy_type: kind,
        market_id: MarketId::from("m1"),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        profit_potential: Decimal::new(5, 2),
        risk_level: RiskLevel::Medium,
        recommended_stake: Decimal::TEN,
        confidence: 0.75,
        selections: vec![Selection {
            outcome_id: OutcomeId::from("home"),
            odds: Decimal::TWO,
            stake: Decimal::TEN,
            probability: Some(Decimal::new(55, 2)),
        }],
    }
}

/// A finished run with `bets` winning bets at even money.
///
/// The id is `bt-{strategy}-{bets}`, so runs of one strategy with distinct
/// bet counts do not collide.
pub fn backtest_result(strategy: &str, bets: usize) -> BacktestResult {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    let initial = Decimal::ONE_THOUSAND;
    let config = BacktestConfig::new(DateRange::new(start, start + Duration::days(30)), initial);

    let mut bankroll = initial;
    let mut settled = Vec::with_capacity(bets);
    let mut equity_curve = Vec::with_capacity(bets);
    for n in 0..bets {
        let placed_at = kickoff(start) + Duration::days(n as i64);
        let stake = Decimal::TEN * Decimal::from(n + 1);
        bankroll += stake;
        settled.push(BacktestBet {
            id: BetId::sequence(n + 1),
            market_id: MarketId::new(format!("soccer:fixture-{n}")),
            strategy_type: StrategyType::ValueBetting,
            placed_at,
            risk_level: RiskLevel::Medium,
            profit_potential: Decimal::new(25, 2),
            confidence: 0.75,
            selections: vec![Selection {
                outcome_id: OutcomeId::from("home"),
                odds: Decimal::TWO,
                stake,
                probability: Some(Decimal::new(625, 3)),
            }],
            stake,
            odds: Decimal::TWO,
            outcome: BetOutcome::Won,
            profit: stake,
            bankroll_after: bankroll,
        });
        equity_curve.push(EquityPoint {
            timestamp: placed_at,
            equity: bankroll,
        });
    }

    let metrics =
        BacktestMetrics::compute(&settled, initial, &equity_curve, config.drawdown_mode);
    BacktestResult {
        id: BacktestId::new(format!("bt-{strategy}-{bets}")),
        strategy_id: StrategyId::from(strategy),
        config,
        metrics,
        bets: settled,
        equity_curve,
        created_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap() + Duration::seconds(bets as i64),
    }
}
