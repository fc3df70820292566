//! Handler for the `check` command.

use std::path::Path;

use serde_json::json;
use tabled::{Table, Tabled};

use super::output;
use crate::domain::{Strategy, StrategyKind};
use crate::error::Result;
use crate::infrastructure::config::Config;

#[derive(Tabled)]
struct StrategyRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Parameters")]
    params: String,
}

impl From<&Strategy> for StrategyRow {
    fn from(strategy: &Strategy) -> Self {
        Self {
            id: strategy.id.to_string(),
            kind: strategy.strategy_type().to_string(),
            params: describe(&strategy.kind),
        }
    }
}

fn describe(kind: &StrategyKind) -> String {
    match kind {
        StrategyKind::ValueBetting(p) => {
            format!("min_edge={} stake_fraction={}", p.min_edge, p.stake_fraction)
        }
        StrategyKind::Arbitrage(p) | StrategyKind::SureBetting(p) => {
            format!("min_profit_ratio={} total_stake={}", p.min_profit_ratio, p.total_stake)
        }
        StrategyKind::KellyCriterion(p) => format!("fraction={}", p.fraction),
    }
}

/// Validate the configuration file without connecting to anything.
pub fn execute(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "check",
            "valid": true,
            "feed_url": config.feed.url,
            "markets": config.feed.market_ids,
            "strategies": config.strategies,
            "database": config.backtest.database,
            "data_path": config.backtest.data_path,
            "telegram": config.telegram.enabled,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Configuration Check");
    output::field("Config", config_path.display());
    output::success("Configuration file is valid");

    output::section("Feed");
    output::field("URL", &config.feed.url);
    output::field("Markets", config.feed.market_ids.len());
    output::field("Heartbeat", format!("{}s", config.feed.heartbeat_interval_secs));
    output::field(
        "Reconnect",
        format!(
            "{}ms..{}ms, {} attempts",
            config.reconnection.base_delay_ms,
            config.reconnection.max_delay_ms,
            config.reconnection.max_attempts
        ),
    );
    if config.feed.market_ids.is_empty() {
        output::warning("No markets configured; pass --market to `oddsline run`");
    }

    output::section("Strategies");
    if config.strategies.is_empty() {
        output::warning("No strategies configured");
    } else {
        let rows: Vec<StrategyRow> = config.strategies.iter().map(StrategyRow::from).collect();
        output::lines(&Table::new(rows).to_string());
    }

    output::section("Backtest");
    output::field("Database", &config.backtest.database);
    match &config.backtest.data_path {
        Some(path) if path.exists() => output::field("Data", path.display()),
        Some(path) => output::warning(&format!("Data file not found: {}", path.display())),
        None => output::field("Data", "not configured"),
    }

    output::section("Alerts");
    if config.telegram.enabled {
        if config.telegram.is_configured() {
            output::success("Telegram integration configured");
        } else {
            output::warning("Telegram enabled but TELEGRAM_BOT_TOKEN or chat_id is missing");
        }
    } else {
        output::field("Telegram", "disabled");
    }

    output::success("Configuration check complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{ArbitrageParams, KellyParams};

    #[test]
    fn describes_parameters_per_kind() {
        let kelly = StrategyKind::KellyCriterion(KellyParams {
            fraction: dec!(0.25),
        });
        assert_eq!(describe(&kelly), "fraction=0.25");

        let row = StrategyRow::from(&Strategy::new(
            "sure",
            StrategyKind::SureBetting(ArbitrageParams::default()),
        ));
        assert_eq!(row.kind, "SURE_BETTING");
        assert!(row.params.starts_with("min_profit_ratio=0.01"));
    }
}
