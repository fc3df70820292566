//! Handler for the `backtest` command.

use rust_decimal::Decimal;
use serde_json::json;

use super::command::BacktestArgs;
use super::{load_config, output};
use crate::domain::{
    BacktestConfig, BacktestResult, DateRange, DrawdownMode, HistoricalFilters,
};
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::build_backtest_engine;

/// Build the run configuration from command-line arguments.
fn backtest_config(args: &BacktestArgs) -> BacktestConfig {
    let filters = HistoricalFilters {
        sports: args.sports.clone(),
        leagues: args.leagues.clone(),
        min_odds: args.min_odds,
        max_odds: args.max_odds,
    };
    let drawdown_mode = if args.drawdown_ratio {
        DrawdownMode::Ratio
    } else {
        DrawdownMode::Absolute
    };
    BacktestConfig::new(DateRange::new(args.from, args.to), args.bankroll)
        .with_filters(filters)
        .with_staking(args.staking_method())
        .with_drawdown_mode(drawdown_mode)
}

pub async fn execute(args: &BacktestArgs) -> Result<()> {
    let mut config = load_config(&args.config, args.database.as_deref())?;
    if let Some(data) = &args.data {
        config.backtest.data_path = Some(data.clone());
    }
    config.init_logging();

    let strategy = config.strategy(&args.strategy).cloned().ok_or_else(|| {
        Error::NotFound(format!("strategy '{}' is not configured", args.strategy))
    })?;

    let engine = build_backtest_engine(&config)?;
    let run_config = backtest_config(args);

    let pb = output::spinner(&format!(
        "Replaying {} from {} to {}",
        strategy.id, args.from, args.to
    ));
    let result = match engine.run_backtest(&strategy, run_config).await {
        Ok(result) => {
            output::spinner_success(&pb, "Backtest complete");
            result
        }
        Err(e) => {
            output::spinner_fail(&pb, "Backtest failed");
            return Err(e);
        }
    };

    if output::is_json() {
        output::json_output(json!({
            "command": "backtest",
            "result": result,
        }));
        return Ok(());
    }

    print_summary(&result);
    output::hint(&format!("oddsline results {} for the full run", result.id));
    Ok(())
}

pub(crate) fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    output::section("Backtest");
    output::field("Run", &result.id);
    output::field("Strategy", &result.strategy_id);
    output::field(
        "Period",
        format!(
            "{} .. {}",
            result.config.date_range.start, result.config.date_range.end
        ),
    );
    output::field("Bankroll", result.config.initial_bankroll);

    output::section("Metrics");
    output::field("Bets", m.bet_count);
    output::field("Win rate", format!("{:.1}%", m.win_rate * 100.0));
    output::field("ROI", format!("{:.2}%", m.roi * 100.0));
    output::field("Profit", output::signed(m.total_profit));
    output::field("Staked", m.total_staked);
    output::field("Avg odds", m.avg_odds);
    output::field("Sharpe", format!("{:.3}", m.sharpe_ratio));
    match result.config.drawdown_mode {
        DrawdownMode::Absolute => output::field("Max drawdown", m.max_drawdown),
        DrawdownMode::Ratio => output::field(
            "Max drawdown",
            format!("{:.2}%", m.max_drawdown * Decimal::ONE_HUNDRED),
        ),
    }
    output::field("Final equity", m.final_equity);
    if m.bet_count == 0 {
        output::warning("No opportunities found in the selected period");
    }
}
