//! Handler for the `run` command.

use tokio::sync::watch;
use tracing::{error, info};

use super::command::RunArgs;
use super::output;
use crate::domain::MarketId;
use crate::error::Result;
use crate::infrastructure::config::Config;
use crate::infrastructure::Runtime;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    apply_overrides(&mut config, args);
    config.init_logging();

    print_startup(&config);

    let runtime = Runtime::from_config(&config);
    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received"),
            Err(e) => error!(error = %e, "Failed to listen for interrupt"),
        }
        stop.send_replace(true);
    });

    runtime.run(shutdown).await?;
    output::success(&format!(
        "Stopped after {} opportunities",
        runtime.opportunities()
    ));
    Ok(())
}

fn apply_overrides(config: &mut Config, args: &RunArgs) {
    for market in &args.markets {
        let market = MarketId::from(market.as_str());
        if !config.feed.market_ids.contains(&market) {
            config.feed.market_ids.push(market);
        }
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    if args.json_logs || output::is_json() {
        config.logging.format = "json".into();
    }
}

fn print_startup(config: &Config) {
    let strategies: Vec<String> = config.strategies.iter().map(|s| s.id.to_string()).collect();
    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Feed", &config.feed.url);
    output::field("Markets", config.feed.market_ids.len());
    output::field(
        "Strategies",
        if strategies.is_empty() {
            "none".to_string()
        } else {
            strategies.join(", ")
        },
    );
    output::field("Bankroll", config.live.bankroll);
    if output::verbosity() > 0 {
        output::field("Cache TTL", format!("{}s", config.cache.ttl_secs));
        output::field(
            "Health check",
            format!("every {}s", config.health.check_interval_secs),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn args(markets: &[&str]) -> RunArgs {
        RunArgs {
            config: PathBuf::from("oddsline.toml"),
            markets: markets.iter().map(|m| (*m).to_string()).collect(),
            log_level: Some("debug".into()),
            json_logs: true,
        }
    }

    #[test]
    fn overrides_merge_markets_and_logging() {
        let mut config = Config::default();
        config.feed.market_ids = vec![MarketId::from("1.1")];

        apply_overrides(&mut config, &args(&["1.1", "1.2"]));

        assert_eq!(
            config.feed.market_ids,
            vec![MarketId::from("1.1"), MarketId::from("1.2")]
        );
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.is_json());
    }
}
