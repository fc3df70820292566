//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; secrets such as the Telegram bot
//! token come from the environment.
//!
//! # Example
//!
//! ```no_run
//! use oddsline::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("oddsline.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use super::logging::LoggingConfig;
use super::telegram::TelegramAppConfig;
use crate::application::{
    CacheConfig, FeedConfig, HealthConfig, MetricsConfig, ReconnectionConfig,
};
use crate::domain::{Strategy, StrategyKind};
use crate::error::{ConfigError, Result};

/// Backtest persistence and data source settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestSettings {
    /// SQLite database holding finished runs.
    #[serde(default = "default_database_path")]
    pub database: String,
    /// JSON file with historical odds and match results.
    #[serde(default)]
    pub data_path: Option<PathBuf>,
}

fn default_database_path() -> String {
    "oddsline.db".to_string()
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            data_path: None,
        }
    }
}

/// Live evaluation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveSettings {
    /// Bankroll the live evaluator sizes stakes against.
    #[serde(default = "default_bankroll")]
    pub bankroll: Decimal,
}

fn default_bankroll() -> Decimal {
    Decimal::new(1000, 0)
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            bankroll: default_bankroll(),
        }
    }
}

/// Main application configuration.
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,

    /// Backoff schedule for feed reconnects.
    #[serde(default)]
    pub reconnection: ReconnectionConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Strategies evaluated live and available to backtests.
    #[serde(default)]
    pub strategies: Vec<Strategy>,

    #[serde(default)]
    pub live: LiveSettings,

    #[serde(default)]
    pub backtest: BacktestSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Telegram alert settings. The bot token is read from
    /// `TELEGRAM_BOT_TOKEN`.
    #[serde(default)]
    pub telegram: TelegramAppConfig,
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.telegram.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Look up a configured strategy by id.
    #[must_use]
    pub fn strategy(&self, id: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.id.as_str() == id)
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Validate configuration values.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        self.validate_feed()?;
        self.validate_reconnection()?;
        self.validate_runtime_intervals()?;
        self.validate_strategies()?;

        if self.live.bankroll < Decimal::ZERO {
            return Err(invalid("live.bankroll", "must be 0 or greater"));
        }
        if self.backtest.database.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "backtest.database",
            }
            .into());
        }
        Ok(())
    }

    fn validate_feed(&self) -> Result<()> {
        let url = Url::parse(&self.feed.url).map_err(|e| ConfigError::InvalidValue {
            field: "feed.url",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(invalid("feed.url", "scheme must be ws or wss"));
        }
        if self.feed.heartbeat_interval_secs == 0 {
            return Err(invalid("feed.heartbeat_interval_secs", "must be greater than 0"));
        }
        if self.feed.stale_threshold_secs == 0 {
            return Err(invalid("feed.stale_threshold_secs", "must be greater than 0"));
        }
        if self.feed.command_capacity == 0 {
            return Err(invalid("feed.command_capacity", "must be greater than 0"));
        }
        Ok(())
    }

    fn validate_reconnection(&self) -> Result<()> {
        if self.reconnection.base_delay_ms == 0 {
            return Err(invalid("reconnection.base_delay_ms", "must be greater than 0"));
        }
        if self.reconnection.max_delay_ms < self.reconnection.base_delay_ms {
            return Err(invalid(
                "reconnection.max_delay_ms",
                "must be >= base_delay_ms",
            ));
        }
        Ok(())
    }

    fn validate_runtime_intervals(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "must be greater than 0"));
        }
        if self.cache.channel_capacity == 0 {
            return Err(invalid("cache.channel_capacity", "must be greater than 0"));
        }
        if self.health.check_interval_secs == 0 {
            return Err(invalid("health.check_interval_secs", "must be greater than 0"));
        }
        if self.health.failure_threshold == 0 {
            return Err(invalid("health.failure_threshold", "must be greater than 0"));
        }
        if self.health.max_latency_ms < self.health.max_avg_latency_ms {
            return Err(invalid(
                "health.max_latency_ms",
                "must be >= max_avg_latency_ms",
            ));
        }
        if self.metrics.window_size == 0 {
            return Err(invalid("metrics.window_size", "must be greater than 0"));
        }
        if self.metrics.report_interval_secs == 0 {
            return Err(invalid("metrics.report_interval_secs", "must be greater than 0"));
        }
        if self.metrics.min_message_rate < 0.0 {
            return Err(invalid("metrics.min_message_rate", "must be 0 or greater"));
        }
        Ok(())
    }

    fn validate_strategies(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for strategy in &self.strategies {
            if strategy.id.as_str().trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "strategies.id",
                }
                .into());
            }
            if !seen.insert(strategy.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "strategies.id",
                    reason: format!("duplicate strategy id '{}'", strategy.id),
                }
                .into());
            }

            match &strategy.kind {
                StrategyKind::ValueBetting(params) => {
                    if params.min_edge < Decimal::ZERO {
                        return Err(invalid("strategies.min_edge", "must be 0 or greater"));
                    }
                    if params.stake_fraction <= Decimal::ZERO
                        || params.stake_fraction > Decimal::ONE
                    {
                        return Err(invalid(
                            "strategies.stake_fraction",
                            "must be in (0, 1]",
                        ));
                    }
                }
                StrategyKind::Arbitrage(params) | StrategyKind::SureBetting(params) => {
                    if params.min_profit_ratio < Decimal::ZERO {
                        return Err(invalid(
                            "strategies.min_profit_ratio",
                            "must be 0 or greater",
                        ));
                    }
                    if params.total_stake <= Decimal::ZERO {
                        return Err(invalid("strategies.total_stake", "must be greater than 0"));
                    }
                }
                StrategyKind::KellyCriterion(params) => {
                    if params.fraction <= Decimal::ZERO || params.fraction > Decimal::ONE {
                        return Err(invalid("strategies.fraction", "must be in (0, 1]"));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::StrategyType;
    use crate::error::Error;

    fn invalid_field(result: Result<Config>) -> &'static str {
        match result {
            Err(Error::Config(ConfigError::InvalidValue { field, .. })) => field,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.feed.heartbeat_interval_secs, 30);
        assert_eq!(config.feed.stale_threshold_secs, 60);
        assert_eq!(config.reconnection.base_delay_ms, 1000);
        assert_eq!(config.reconnection.max_attempts, 10);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.health.failure_threshold, 5);
        assert_eq!(config.health.alert_cooldown_secs, 300);
        assert_eq!(config.metrics.window_size, 1000);
        assert_eq!(config.backtest.database, "oddsline.db");
        assert_eq!(config.live.bankroll, dec!(1000));
        assert_eq!(config.logging.level, "info");
        assert!(config.strategies.is_empty());
        assert!(!config.telegram.enabled);
    }

    #[test]
    fn example_config_is_valid() {
        let config = Config::parse_toml(include_str!("../../../oddsline.example.toml")).unwrap();
        assert_eq!(config.strategies.len(), 3);
        assert!(!config.telegram.enabled);
    }

    #[test]
    fn parses_full_file() {
        let toml = r#"
            [feed]
            url = "wss://stream.example.com/odds"
            market_ids = ["1.234", "1.235"]
            conflate_ms = 250

            [reconnection]
            base_delay_ms = 500
            max_delay_ms = 10000
            max_attempts = 3
            jitter = false

            [cache]
            ttl_secs = 30
            sweep_interval_secs = 10

            [health]
            failure_threshold = 3

            [[strategies]]
            id = "kelly-quarter"
            kind = "KELLY_CRITERION"
            fraction = 0.25

            [[strategies]]
            id = "arb"
            kind = "ARBITRAGE"
            min_profit_ratio = 0.02
            total_stake = 200

            [[strategies]]
            id = "value"
            kind = "VALUE_BETTING"

            [backtest]
            database = "runs.db"
            data_path = "history.json"

            [logging]
            level = "debug"
            format = "json"
        "#;
        let config = Config::parse_toml(toml).unwrap();

        assert_eq!(config.feed.market_ids.len(), 2);
        assert_eq!(config.feed.conflate_ms, 250);
        assert!(!config.reconnection.jitter);
        assert_eq!(config.cache.sweep_interval_secs, 10);
        assert_eq!(config.health.failure_threshold, 3);
        assert_eq!(config.strategies.len(), 3);
        assert_eq!(
            config.strategy("kelly-quarter").unwrap().strategy_type(),
            StrategyType::KellyCriterion
        );
        match &config.strategy("arb").unwrap().kind {
            StrategyKind::Arbitrage(params) => {
                assert_eq!(params.min_profit_ratio, dec!(0.02));
                assert_eq!(params.total_stake, dec!(200));
            }
            other => panic!("unexpected kind {other:?}"),
        }
        match &config.strategy("value").unwrap().kind {
            StrategyKind::ValueBetting(params) => assert_eq!(params.min_edge, dec!(0.05)),
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(config.backtest.data_path, Some(PathBuf::from("history.json")));
        assert!(config.logging.is_json());
    }

    #[test]
    fn rejects_unknown_strategy_kind() {
        let toml = r#"
            [[strategies]]
            id = "mystery"
            kind = "MARTINGALE"
        "#;
        assert!(matches!(
            Config::parse_toml(toml),
            Err(Error::Config(ConfigError::Parse(_)))
        ));
    }

    #[test]
    fn rejects_bad_feed_url() {
        assert_eq!(
            invalid_field(Config::parse_toml("[feed]\nurl = \"not a url\"")),
            "feed.url"
        );
        assert_eq!(
            invalid_field(Config::parse_toml("[feed]\nurl = \"https://example.com\"")),
            "feed.url"
        );
    }

    #[test]
    fn rejects_zero_intervals() {
        assert_eq!(
            invalid_field(Config::parse_toml("[feed]\nheartbeat_interval_secs = 0")),
            "feed.heartbeat_interval_secs"
        );
        assert_eq!(
            invalid_field(Config::parse_toml("[health]\ncheck_interval_secs = 0")),
            "health.check_interval_secs"
        );
        assert_eq!(
            invalid_field(Config::parse_toml("[cache]\nttl_secs = 0")),
            "cache.ttl_secs"
        );
        assert_eq!(
            invalid_field(Config::parse_toml("[metrics]\nreport_interval_secs = 0")),
            "metrics.report_interval_secs"
        );
    }

    #[test]
    fn rejects_max_delay_below_base() {
        let toml = "[reconnection]\nbase_delay_ms = 5000\nmax_delay_ms = 1000";
        assert_eq!(
            invalid_field(Config::parse_toml(toml)),
            "reconnection.max_delay_ms"
        );
    }

    #[test]
    fn rejects_kelly_fraction_out_of_range() {
        for fraction in ["0", "1.5", "-0.25"] {
            let toml = format!(
                "[[strategies]]\nid = \"k\"\nkind = \"KELLY_CRITERION\"\nfraction = {fraction}"
            );
            assert_eq!(
                invalid_field(Config::parse_toml(&toml)),
                "strategies.fraction",
                "fraction {fraction}"
            );
        }
        let full = "[[strategies]]\nid = \"k\"\nkind = \"KELLY_CRITERION\"\nfraction = 1";
        assert!(Config::parse_toml(full).is_ok());
    }

    #[test]
    fn rejects_negative_thresholds() {
        let toml = "[[strategies]]\nid = \"v\"\nkind = \"VALUE_BETTING\"\nmin_edge = -0.1";
        assert_eq!(invalid_field(Config::parse_toml(toml)), "strategies.min_edge");

        let toml = "[[strategies]]\nid = \"a\"\nkind = \"SURE_BETTING\"\nmin_profit_ratio = -0.01";
        assert_eq!(
            invalid_field(Config::parse_toml(toml)),
            "strategies.min_profit_ratio"
        );

        assert_eq!(
            invalid_field(Config::parse_toml("[metrics]\nmin_message_rate = -1.0")),
            "metrics.min_message_rate"
        );
    }

    #[test]
    fn rejects_duplicate_strategy_ids() {
        let toml = r#"
            [[strategies]]
            id = "dup"
            kind = "ARBITRAGE"

            [[strategies]]
            id = "dup"
            kind = "SURE_BETTING"
        "#;
        assert_eq!(invalid_field(Config::parse_toml(toml)), "strategies.id");
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/oddsline.toml"),
            Err(Error::Config(ConfigError::ReadFile(_)))
        ));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oddsline.toml");
        std::fs::write(&path, "[live]\nbankroll = 250").unwrap();
        assert_eq!(Config::load(&path).unwrap().live.bankroll, dec!(250));
    }
}
