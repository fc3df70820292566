//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::backtests;

/// Database row for a backtest run. Structured columns hold JSON.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = backtests)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BacktestRow {
    pub id: String,
    pub strategy_id: String,
    pub config: String,
    pub metrics: String,
    pub bets: String,
    pub equity_curve: String,
    pub created_at: String,
}
