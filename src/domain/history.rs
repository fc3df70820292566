//! Historical odds and settlement records consumed by backtests.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{MarketId, OutcomeId};
use super::snapshot::{MarketSnapshot, OutcomeQuote};

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        day >= self.start && day <= self.end
    }
}

/// Event filters applied when loading history.
///
/// Empty sport/league lists match everything. Odds bounds apply to every
/// price of the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalFilters {
    #[serde(default)]
    pub sports: Vec<String>,
    #[serde(default)]
    pub leagues: Vec<String>,
    #[serde(default)]
    pub min_odds: Option<Decimal>,
    #[serde(default)]
    pub max_odds: Option<Decimal>,
}

impl HistoricalFilters {
    #[must_use]
    pub fn matches(&self, odds: &HistoricalOdds) -> bool {
        let sport_ok = self.sports.is_empty()
            || self.sports.iter().any(|s| s.eq_ignore_ascii_case(&odds.sport));
        let league_ok = self.leagues.is_empty()
            || odds
                .league
                .as_deref()
                .is_some_and(|league| self.leagues.iter().any(|l| l.eq_ignore_ascii_case(league)));
        let bounds_ok = odds.odds.values().all(|price| {
            self.min_odds.map_or(true, |min| *price >= min)
                && self.max_odds.map_or(true, |max| *price <= max)
        });
        sport_ok && league_ok && bounds_ok && !odds.odds.is_empty()
    }
}

/// Pre-match odds for one event from one bookmaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOdds {
    pub sport: String,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default = "default_market")]
    pub market: String,
    pub home_team: String,
    pub away_team: String,
    pub match_date: DateTime<Utc>,
    pub bookmaker: String,
    /// Decimal odds keyed by outcome (`home`, `draw`, `away` or `1`, `X`, `2`).
    pub odds: BTreeMap<String, Decimal>,
    /// Model probabilities keyed like `odds`, when available.
    #[serde(default)]
    pub probabilities: BTreeMap<String, Decimal>,
    pub timestamp: DateTime<Utc>,
}

fn default_market() -> String {
    "MATCH_WINNER".to_string()
}

impl HistoricalOdds {
    /// Stable market id derived from the fixture.
    #[must_use]
    pub fn market_id(&self) -> MarketId {
        MarketId::new(format!(
            "{}:{}:{}-{}",
            self.sport.to_lowercase(),
            self.match_date.format("%Y%m%d"),
            self.home_team,
            self.away_team
        ))
    }

    /// Convert to the snapshot shape the strategy engine evaluates.
    #[must_use]
    pub fn to_snapshot(&self) -> MarketSnapshot {
        let quotes = self
            .odds
            .iter()
            .map(|(outcome, price)| {
                let mut quote =
                    OutcomeQuote::new(OutcomeId::new(outcome.clone()), *price).with_source(&self.bookmaker);
                quote.probability = self.probabilities.get(outcome).copied();
                quote
            })
            .collect();
        MarketSnapshot {
            market_id: self.market_id(),
            timestamp: self.timestamp,
            quotes,
        }
    }
}

/// Final result of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Home,
    Away,
    Draw,
}

impl Winner {
    /// Whether a selection on `outcome` wins under this result.
    #[must_use]
    pub fn pays(self, outcome: &OutcomeId) -> bool {
        let key = outcome.as_str();
        match self {
            Self::Home => key.eq_ignore_ascii_case("home") || key == "1",
            Self::Away => key.eq_ignore_ascii_case("away") || key == "2",
            Self::Draw => key.eq_ignore_ascii_case("draw") || key.eq_ignore_ascii_case("x"),
        }
    }
}

/// Settlement record for a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub sport: String,
    pub home_team: String,
    pub away_team: String,
    pub match_date: DateTime<Utc>,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    #[serde(default)]
    pub winner: Option<Winner>,
}

impl MatchResult {
    /// Winner as recorded, or derived from the score.
    #[must_use]
    pub fn outcome(&self) -> Option<Winner> {
        self.winner.or_else(|| match (self.home_score, self.away_score) {
            (Some(h), Some(a)) if h > a => Some(Winner::Home),
            (Some(h), Some(a)) if h < a => Some(Winner::Away),
            (Some(_), Some(_)) => Some(Winner::Draw),
            _ => None,
        })
    }

    /// Whether this result settles the fixture described by `odds`.
    #[must_use]
    pub fn is_for(&self, odds: &HistoricalOdds) -> bool {
        self.sport.eq_ignore_ascii_case(&odds.sport)
            && self.home_team == odds.home_team
            && self.away_team == odds.away_team
            && self.match_date.date_naive() == odds.match_date.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fixture() -> HistoricalOdds {
        HistoricalOdds {
            sport: "Soccer".into(),
            league: Some("PL".into()),
            market: default_market(),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            match_date: DateTime::from_timestamp(1_704_110_400, 0).unwrap(),
            bookmaker: "pinnacle".into(),
            odds: BTreeMap::from([
                ("home".to_string(), dec!(2.1)),
                ("draw".to_string(), dec!(3.4)),
                ("away".to_string(), dec!(3.6)),
            ]),
            probabilities: BTreeMap::from([("home".to_string(), dec!(0.55))]),
            timestamp: DateTime::from_timestamp(1_704_100_000, 0).unwrap(),
        }
    }

    #[test]
    fn filters_match_sport_league_and_bounds() {
        let odds = fixture();
        let mut filters = HistoricalFilters {
            sports: vec!["soccer".into()],
            leagues: vec!["pl".into()],
            min_odds: Some(dec!(1.5)),
            max_odds: Some(dec!(4.0)),
        };
        assert!(filters.matches(&odds));

        filters.max_odds = Some(dec!(3.5));
        assert!(!filters.matches(&odds));

        filters.max_odds = None;
        filters.sports = vec!["tennis".into()];
        assert!(!filters.matches(&odds));
    }

    #[test]
    fn snapshot_carries_probabilities_and_source() {
        let snap = fixture().to_snapshot();
        assert_eq!(snap.quotes.len(), 3);
        let home = snap
            .quotes
            .iter()
            .find(|q| q.outcome_id.as_str() == "home")
            .unwrap();
        assert_eq!(home.probability, Some(dec!(0.55)));
        assert_eq!(home.source.as_deref(), Some("pinnacle"));
        assert_eq!(snap.market_id.as_str(), "soccer:20240101:Arsenal-Chelsea");
    }

    #[test]
    fn winner_derived_from_score() {
        let result = MatchResult {
            sport: "soccer".into(),
            home_team: "Arsenal".into(),
            away_team: "Chelsea".into(),
            match_date: fixture().match_date,
            home_score: Some(1),
            away_score: Some(1),
            winner: None,
        };
        assert_eq!(result.outcome(), Some(Winner::Draw));
        assert!(result.is_for(&fixture()));
        assert!(Winner::Draw.pays(&OutcomeId::from("X")));
        assert!(!Winner::Home.pays(&OutcomeId::from("away")));
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(range.contains(fixture().match_date));
    }
}
