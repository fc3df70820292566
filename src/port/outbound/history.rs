//! Historical data port consumed by the backtest engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DateRange, HistoricalFilters, HistoricalOdds, MatchResult};
use crate::error::Result;

#[async_trait]
pub trait HistoricalDataSource: Send + Sync {
    /// Odds for every event matching `filters` within `range`.
    async fn historical_odds(
        &self,
        filters: &HistoricalFilters,
        range: &DateRange,
    ) -> Result<Vec<HistoricalOdds>>;

    /// Settlement for a fixture, or `None` when no result is recorded.
    async fn match_result(
        &self,
        sport: &str,
        home_team: &str,
        away_team: &str,
        match_date: DateTime<Utc>,
    ) -> Result<Option<MatchResult>>;
}
