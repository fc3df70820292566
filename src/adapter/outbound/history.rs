//! Historical odds loaded from a JSON dataset file.
//!
//! ```json
//! {
//!   "odds": [{"sport":"soccer","home_team":"A","away_team":"B", ...}],
//!   "results": [{"sport":"soccer","home_team":"A","away_team":"B","winner":"home", ...}]
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DateRange, HistoricalFilters, HistoricalOdds, MatchResult};
use crate::error::Result;
use crate::port::HistoricalDataSource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataset {
    #[serde(default)]
    pub odds: Vec<HistoricalOdds>,
    #[serde(default)]
    pub results: Vec<MatchResult>,
}

/// In-memory historical data source filtered on every query.
pub struct JsonHistory {
    dataset: HistoricalDataset,
}

impl JsonHistory {
    #[must_use]
    pub fn new(dataset: HistoricalDataset) -> Self {
        Self { dataset }
    }

    /// Read a dataset file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid dataset.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dataset: HistoricalDataset = serde_json::from_str(&content)?;
        debug!(
            path = %path.display(),
            odds = dataset.odds.len(),
            results = dataset.results.len(),
            "Loaded historical dataset"
        );
        Ok(Self::new(dataset))
    }
}

#[async_trait]
impl HistoricalDataSource for JsonHistory {
    async fn historical_odds(
        &self,
        filters: &HistoricalFilters,
        range: &DateRange,
    ) -> Result<Vec<HistoricalOdds>> {
        let mut odds: Vec<HistoricalOdds> = self
            .dataset
            .odds
            .iter()
            .filter(|o| range.contains(o.match_date) && filters.matches(o))
            .cloned()
            .collect();
        odds.sort_by(|a, b| {
            a.match_date
                .cmp(&b.match_date)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });
        Ok(odds)
    }

    async fn match_result(
        &self,
        sport: &str,
        home_team: &str,
        away_team: &str,
        match_date: DateTime<Utc>,
    ) -> Result<Option<MatchResult>> {
        Ok(self
            .dataset
            .results
            .iter()
            .find(|r| {
                r.sport.eq_ignore_ascii_case(sport)
                    && r.home_team == home_team
                    && r.away_team == away_team
                    && r.match_date.date_naive() == match_date.date_naive()
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::NaiveDate;

    use super::*;
    use crate::testkit::domain::{historical_odds, match_result};
    use crate::domain::Winner;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn filters_by_range_and_sorts_chronologically() {
        let history = JsonHistory::new(HistoricalDataset {
            odds: vec![
                historical_odds("C", "D", day(3), &[("home", "2.0"), ("away", "2.0")]),
                historical_odds("A", "B", day(1), &[("home", "2.0"), ("away", "2.0")]),
                historical_odds("E", "F", day(9), &[("home", "2.0"), ("away", "2.0")]),
            ],
            results: vec![],
        });

        let odds = history
            .historical_odds(&HistoricalFilters::default(), &DateRange::new(day(1), day(5)))
            .await
            .unwrap();

        let homes: Vec<_> = odds.iter().map(|o| o.home_team.as_str()).collect();
        assert_eq!(homes, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn finds_result_by_fixture() {
        let history = JsonHistory::new(HistoricalDataset {
            odds: vec![],
            results: vec![match_result("A", "B", day(1), Winner::Away)],
        });
        let fixture = historical_odds("A", "B", day(1), &[("home", "2.0")]);

        let found = history
            .match_result("SOCCER", "A", "B", fixture.match_date)
            .await
            .unwrap();
        assert_eq!(found.unwrap().winner, Some(Winner::Away));

        let missing = history
            .match_result("soccer", "B", "A", fixture.match_date)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn load_reads_dataset_file() {
        let dataset = HistoricalDataset {
            odds: vec![historical_odds("A", "B", day(1), &[("home", "1.9")])],
            results: vec![match_result("A", "B", day(1), Winner::Home)],
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&dataset).unwrap().as_bytes())
            .unwrap();

        let history = JsonHistory::load(file.path()).unwrap();
        assert_eq!(history.dataset, dataset);
    }
}
