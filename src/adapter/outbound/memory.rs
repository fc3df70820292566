//! In-memory backtest store for tests and throwaway runs.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{BacktestId, BacktestResult, StrategyId};
use crate::error::Result;
use crate::port::BacktestStore;

/// Keeps runs in insertion order; saving an existing id replaces it in place.
#[derive(Default)]
pub struct MemoryBacktestStore {
    runs: RwLock<Vec<BacktestResult>>,
}

impl MemoryBacktestStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.read().is_empty()
    }
}

#[async_trait]
impl BacktestStore for MemoryBacktestStore {
    async fn save(&self, result: &BacktestResult) -> Result<()> {
        let mut runs = self.runs.write();
        match runs.iter_mut().find(|r| r.id == result.id) {
            Some(existing) => *existing = result.clone(),
            None => runs.push(result.clone()),
        }
        Ok(())
    }

    async fn get(&self, id: &BacktestId) -> Result<Option<BacktestResult>> {
        Ok(self.runs.read().iter().find(|r| &r.id == id).cloned())
    }

    async fn list_by_strategy(&self, strategy_id: &StrategyId) -> Result<Vec<BacktestResult>> {
        Ok(self
            .runs
            .read()
            .iter()
            .filter(|r| &r.strategy_id == strategy_id)
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<BacktestResult>> {
        Ok(self.runs.read().clone())
    }
}
