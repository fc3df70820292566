//! Handler for the `results` command.

use serde_json::json;
use tabled::{Table, Tabled};

use super::backtest::print_summary;
use super::command::ResultsArgs;
use super::{load_config, output};
use crate::domain::{BacktestId, BacktestResult, StrategyId};
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::build_results_engine;

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Run")]
    id: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Bets")]
    bets: usize,
    #[tabled(rename = "Win %")]
    win_rate: String,
    #[tabled(rename = "ROI %")]
    roi: String,
    #[tabled(rename = "Profit")]
    profit: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&BacktestResult> for RunRow {
    fn from(run: &BacktestResult) -> Self {
        Self {
            id: run.id.to_string(),
            strategy: run.strategy_id.to_string(),
            period: format!(
                "{}..{}",
                run.config.date_range.start, run.config.date_range.end
            ),
            bets: run.metrics.bet_count,
            win_rate: format!("{:.1}", run.metrics.win_rate * 100.0),
            roi: format!("{:.2}", run.metrics.roi * 100.0),
            profit: run.metrics.total_profit.to_string(),
            created: run.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

pub async fn execute(args: &ResultsArgs) -> Result<()> {
    let config = load_config(&args.config, args.database.as_deref())?;
    config.init_logging();
    let engine = build_results_engine(&config)?;

    if let Some(id) = &args.id {
        let result = engine
            .get_result(&BacktestId::from(id.as_str()))
            .await?
            .ok_or_else(|| Error::NotFound(format!("backtest run '{id}'")))?;
        if output::is_json() {
            output::json_output(json!({ "command": "results", "result": result }));
        } else {
            print_summary(&result);
        }
        return Ok(());
    }

    let strategy = args.strategy.as_deref().map(StrategyId::from);
    let runs = engine.list_results(strategy.as_ref()).await?;

    if output::is_json() {
        output::json_output(json!({ "command": "results", "runs": runs }));
        return Ok(());
    }

    output::section("Backtest Runs");
    if runs.is_empty() {
        output::warning("No backtest runs stored");
        output::hint("oddsline backtest --strategy <ID> --from <DATE> --to <DATE>");
        return Ok(());
    }
    let rows: Vec<RunRow> = runs.iter().map(RunRow::from).collect();
    output::lines(&Table::new(rows).to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::backtest_result;

    #[test]
    fn row_formats_percentages() {
        let run = backtest_result("value", 2);
        let row = RunRow::from(&run);
        assert_eq!(row.id, "bt-value-2");
        assert_eq!(row.strategy, "value");
        assert_eq!(row.period, "2024-01-01..2024-01-31");
        assert_eq!(row.bets, 2);
        assert_eq!(row.win_rate, "100.0");
        assert_eq!(row.profit, "30");
    }
}
