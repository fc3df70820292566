//! Handler for the `compare` command.

use serde_json::json;
use tabled::{Table, Tabled};

use super::command::CompareArgs;
use super::{load_config, output};
use crate::domain::{StrategyComparison, StrategyId};
use crate::error::Result;
use crate::infrastructure::bootstrap::build_results_engine;

#[derive(Tabled)]
struct ComparisonRow {
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Runs")]
    runs: usize,
    #[tabled(rename = "Bets")]
    bets: usize,
    #[tabled(rename = "Win %")]
    win_rate: String,
    #[tabled(rename = "ROI %")]
    roi: String,
    #[tabled(rename = "Profit")]
    profit: String,
    #[tabled(rename = "Sharpe")]
    sharpe: String,
    #[tabled(rename = "Max DD")]
    max_drawdown: String,
}

impl From<&StrategyComparison> for ComparisonRow {
    fn from(c: &StrategyComparison) -> Self {
        Self {
            strategy: c.strategy_id.to_string(),
            runs: c.runs,
            bets: c.bet_count,
            win_rate: format!("{:.1}", c.win_rate * 100.0),
            roi: format!("{:.2}", c.roi * 100.0),
            profit: c.total_profit.to_string(),
            sharpe: format!("{:.3}", c.avg_sharpe),
            max_drawdown: c.max_drawdown.to_string(),
        }
    }
}

pub async fn execute(args: &CompareArgs) -> Result<()> {
    let config = load_config(&args.config, args.database.as_deref())?;
    config.init_logging();
    let engine = build_results_engine(&config)?;

    let ids: Vec<StrategyId> = args
        .strategies
        .iter()
        .map(|s| StrategyId::from(s.as_str()))
        .collect();
    let comparisons = engine.compare_strategies(&ids).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "compare",
            "strategies": comparisons,
        }));
        return Ok(());
    }

    output::section("Strategy Comparison");
    let missing: Vec<&StrategyId> = ids
        .iter()
        .filter(|id| !comparisons.iter().any(|c| &c.strategy_id == *id))
        .collect();
    for id in missing {
        output::warning(&format!("No persisted runs for '{id}'"));
    }
    if comparisons.is_empty() {
        return Ok(());
    }

    let rows: Vec<ComparisonRow> = comparisons.iter().map(ComparisonRow::from).collect();
    output::lines(&Table::new(rows).to_string());

    if let Some(best) = comparisons
        .iter()
        .max_by(|a, b| a.roi.total_cmp(&b.roi))
    {
        output::field("Best ROI", &best.strategy_id);
    }
    Ok(())
}
