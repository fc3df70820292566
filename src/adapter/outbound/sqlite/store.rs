//! SQLite backtest store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::database::connection::DbPool;
use super::database::model::BacktestRow;
use super::database::schema::backtests;
use crate::domain::{BacktestId, BacktestResult, StrategyId};
use crate::error::{Error, Result};
use crate::port::BacktestStore;

/// SQLite-backed store of completed backtest runs.
pub struct SqliteBacktestStore {
    pool: DbPool,
}

impl SqliteBacktestStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn to_row(result: &BacktestResult) -> Result<BacktestRow> {
        Ok(BacktestRow {
            id: result.id.to_string(),
            strategy_id: result.strategy_id.to_string(),
            config: serde_json::to_string(&result.config)?,
            metrics: serde_json::to_string(&result.metrics)?,
            bets: serde_json::to_string(&result.bets)?,
            equity_curve: serde_json::to_string(&result.equity_curve)?,
            created_at: result.created_at.to_rfc3339(),
        })
    }

    fn from_row(row: BacktestRow) -> Result<BacktestResult> {
        let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| Error::Parse(e.to_string()))?
            .with_timezone(&Utc);

        Ok(BacktestResult {
            id: BacktestId::from(row.id),
            strategy_id: StrategyId::from(row.strategy_id),
            config: serde_json::from_str(&row.config)?,
            metrics: serde_json::from_str(&row.metrics)?,
            bets: serde_json::from_str(&row.bets)?,
            equity_curve: serde_json::from_str(&row.equity_curve)?,
            created_at,
        })
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>>
    {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }
}

#[async_trait]
impl BacktestStore for SqliteBacktestStore {
    async fn save(&self, result: &BacktestResult) -> Result<()> {
        let row = Self::to_row(result)?;
        let mut conn = self.conn()?;

        diesel::replace_into(backtests::table)
            .values(&row)
            .execute(&mut conn)?;

        Ok(())
    }

    async fn get(&self, id: &BacktestId) -> Result<Option<BacktestResult>> {
        let mut conn = self.conn()?;

        let row: Option<BacktestRow> = backtests::table
            .find(id.as_str())
            .select(BacktestRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(Self::from_row).transpose()
    }

    async fn list_by_strategy(&self, strategy_id: &StrategyId) -> Result<Vec<BacktestResult>> {
        let mut conn = self.conn()?;

        let rows: Vec<BacktestRow> = backtests::table
            .filter(backtests::strategy_id.eq(strategy_id.as_str()))
            .order(backtests::created_at.asc())
            .select(BacktestRow::as_select())
            .load(&mut conn)?;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn list(&self) -> Result<Vec<BacktestResult>> {
        let mut conn = self.conn()?;

        let rows: Vec<BacktestRow> = backtests::table
            .order(backtests::created_at.asc())
            .select(BacktestRow::as_select())
            .load(&mut conn)?;

        rows.into_iter().map(Self::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::sqlite::database::connection::open;
    use crate::testkit::domain::backtest_result;

    fn store() -> (tempfile::TempDir, SqliteBacktestStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backtests.db");
        let pool = open(path.to_str().unwrap()).unwrap();
        (dir, SqliteBacktestStore::new(pool))
    }

    #[tokio::test]
    async fn save_then_get_returns_same_result() {
        let (_dir, store) = store();
        let result = backtest_result("value", 3);

        store.save(&result).await.unwrap();
        let loaded = store.get(&result.id).await.unwrap().unwrap();

        assert_eq!(loaded, result);
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let (_dir, store) = store();
        let missing = store.get(&BacktestId::from("missing")).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn list_by_strategy_filters_runs() {
        let (_dir, store) = store();
        store.save(&backtest_result("value", 1)).await.unwrap();
        store.save(&backtest_result("value", 2)).await.unwrap();
        store.save(&backtest_result("arb", 1)).await.unwrap();

        let runs = store
            .list_by_strategy(&StrategyId::from("value"))
            .await
            .unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|r| r.strategy_id.as_str() == "value"));
        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn save_replaces_existing_run() {
        let (_dir, store) = store();
        let mut result = backtest_result("value", 1);
        store.save(&result).await.unwrap();

        result.metrics.bet_count = 42;
        store.save(&result).await.unwrap();

        let loaded = store.get(&result.id).await.unwrap().unwrap();
        assert_eq!(loaded.metrics.bet_count, 42);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
