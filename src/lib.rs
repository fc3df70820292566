//! Oddsline - real-time odds ingestion, strategy evaluation and backtesting.
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Pure data: odds updates, strategies, bankroll, backtest
//!   records and health types.
//! - [`port`] - Traits at the seams: feed transport, historical data,
//!   backtest persistence, alerting and the exchange client.
//! - [`adapter`] - Port implementations (WebSocket feed, SQLite store, JSON
//!   history, log and Telegram notifiers) and the CLI.
//! - [`application`] - Services: [`OddsCache`](application::OddsCache),
//!   [`StreamConnection`](application::StreamConnection), health and metrics,
//!   the strategy engine, live evaluation, backtesting and analytics.
//! - [`infrastructure`] - Configuration and the composition root.
//!
//! # Features
//!
//! - `telegram` (default) - Telegram alert delivery.
//! - `testkit` - Test doubles and builders for integration tests.
//!
//! # Example
//!
//! ```no_run
//! use oddsline::infrastructure::config::Config;
//! use oddsline::infrastructure::Runtime;
//!
//! # async fn run() -> oddsline::error::Result<()> {
//! let config = Config::load("oddsline.toml")?;
//! let runtime = Runtime::from_config(&config);
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! runtime.run(shutdown).await
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
