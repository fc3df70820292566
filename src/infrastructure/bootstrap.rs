//! Infrastructure bootstrap helpers for runtime wiring.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

#[cfg(feature = "telegram")]
use crate::adapter::outbound::notifier::TelegramNotifier;
use crate::adapter::outbound::feed::WebSocketTransport;
use crate::adapter::outbound::history::{HistoricalDataset, JsonHistory};
use crate::adapter::outbound::notifier::LogNotifier;
use crate::adapter::outbound::sqlite::database::connection::open;
use crate::adapter::outbound::sqlite::SqliteBacktestStore;
use crate::application::{BacktestEngine, TransportFactory};
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;
use crate::port::{FeedTransport, NotifierRegistry};

/// Factory opening a fresh WebSocket transport per connect attempt.
#[must_use]
pub fn websocket_factory(url: &str) -> TransportFactory {
    let url = url.to_string();
    Arc::new(move || Box::new(WebSocketTransport::new(url.clone())) as Box<dyn FeedTransport>)
}

/// Build notifier registry from configuration.
///
/// Always logs alerts; adds Telegram when enabled and configured. Must be
/// called inside a Tokio runtime.
#[cfg(feature = "telegram")]
pub fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));

    if config.telegram.enabled {
        match config.telegram.notifier_config() {
            Some(tg_config) => {
                registry.register(Box::new(TelegramNotifier::new(tg_config)));
                info!("Telegram notifier enabled");
            }
            None => warn!("Telegram enabled but TELEGRAM_BOT_TOKEN or chat_id not set"),
        }
    }

    registry
}

/// Build notifier registry from configuration (non-telegram variant).
#[cfg(not(feature = "telegram"))]
pub fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    if config.telegram.enabled {
        warn!("Telegram enabled but the binary was built without the telegram feature");
    }
    registry
}

/// Open the backtest database, applying migrations.
pub fn build_backtest_store(config: &Config) -> Result<Arc<SqliteBacktestStore>> {
    let pool = open(&config.backtest.database)?;
    info!(database = %config.backtest.database, "Backtest store initialized");
    Ok(Arc::new(SqliteBacktestStore::new(pool)))
}

/// Load the configured historical dataset.
pub fn build_history(config: &Config) -> Result<Arc<JsonHistory>> {
    let path = config
        .backtest
        .data_path
        .as_deref()
        .ok_or(ConfigError::MissingField {
            field: "backtest.data_path",
        })?;
    load_history(path)
}

pub fn load_history(path: &Path) -> Result<Arc<JsonHistory>> {
    let history = JsonHistory::load(path)?;
    info!(path = %path.display(), "Historical data loaded");
    Ok(Arc::new(history))
}

/// Backtest engine over the configured dataset and database.
pub fn build_backtest_engine(config: &Config) -> Result<BacktestEngine> {
    let history = build_history(config)?;
    let store = build_backtest_store(config)?;
    Ok(BacktestEngine::new(history, store))
}

/// Engine for queries over persisted runs only. Runs against it find no
/// historical data.
pub fn build_results_engine(config: &Config) -> Result<BacktestEngine> {
    let store = build_backtest_store(config)?;
    Ok(BacktestEngine::new(
        Arc::new(JsonHistory::new(HistoricalDataset::default())),
        store,
    ))
}
