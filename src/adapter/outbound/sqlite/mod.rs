//! SQLite persistence for backtest runs using Diesel ORM.

pub mod database;
mod store;

pub use store::SqliteBacktestStore;
