//! Persistence port for completed backtest runs.

use async_trait::async_trait;

use crate::domain::{BacktestId, BacktestResult, StrategyId};
use crate::error::Result;

#[async_trait]
pub trait BacktestStore: Send + Sync {
    /// Persist a run, replacing any record with the same id.
    async fn save(&self, result: &BacktestResult) -> Result<()>;

    /// Load a run by id.
    async fn get(&self, id: &BacktestId) -> Result<Option<BacktestResult>>;

    /// All runs of a strategy, oldest first.
    async fn list_by_strategy(&self, strategy_id: &StrategyId) -> Result<Vec<BacktestResult>>;

    /// Every persisted run, oldest first.
    async fn list(&self) -> Result<Vec<BacktestResult>>;
}
