//! Handler for the `stats` command.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use tabled::{Table, Tabled};

use super::command::StatsArgs;
use super::{load_config, output};
use crate::application::{AnalyticsService, StrategyPerformance};
use crate::domain::StrategyId;
use crate::error::Result;
use crate::infrastructure::bootstrap::build_results_engine;

#[derive(Tabled)]
struct PerformanceRow {
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Bets")]
    bets: usize,
    #[tabled(rename = "Win %")]
    win_rate: String,
    #[tabled(rename = "ROI %")]
    roi: String,
    #[tabled(rename = "Profit")]
    profit: String,
    #[tabled(rename = "Avg")]
    average: String,
    #[tabled(rename = "Risk")]
    risk: String,
}

impl From<&StrategyPerformance> for PerformanceRow {
    fn from(p: &StrategyPerformance) -> Self {
        Self {
            strategy: p.strategy_id.to_string(),
            kind: p.strategy_type.to_string(),
            bets: p.total_bets,
            win_rate: format!("{:.1}", p.win_rate * 100.0),
            roi: format!("{:.2}", p.roi * 100.0),
            profit: p.total_profit.to_string(),
            average: p.average_profit.round_dp(2).to_string(),
            risk: format!("{} (max {})", p.risk_level, p.max_risk),
        }
    }
}

/// Settlement window for the ROI figure. Open ends are unbounded.
fn window(from: Option<NaiveDate>, to: Option<NaiveDate>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = from.map_or(DateTime::<Utc>::MIN_UTC, |day| {
        day.and_time(NaiveTime::MIN).and_utc()
    });
    let end = to
        .and_then(|day| day.and_hms_nano_opt(23, 59, 59, 999_999_999))
        .map_or(DateTime::<Utc>::MAX_UTC, |at| at.and_utc());
    (start, end)
}

/// Win rate per strategy type present in `performance`.
fn kind_win_rates(
    analytics: &AnalyticsService,
    performance: &[StrategyPerformance],
) -> BTreeMap<String, f64> {
    performance
        .iter()
        .map(|p| {
            (
                p.strategy_type.to_string(),
                analytics.win_rate_for_kind(p.strategy_type),
            )
        })
        .collect()
}

pub async fn execute(args: &StatsArgs) -> Result<()> {
    let config = load_config(&args.config, args.database.as_deref())?;
    config.init_logging();
    let engine = build_results_engine(&config)?;

    let strategy = args.strategy.as_deref().map(StrategyId::from);
    let runs = engine.list_results(strategy.as_ref()).await?;

    let analytics = AnalyticsService::new();
    let bets: usize = runs.iter().map(|run| analytics.ingest_backtest(run)).sum();
    let performance = analytics.all_performance();
    let by_kind = kind_win_rates(&analytics, &performance);
    let (from, to) = window(args.from, args.to);
    let roi = analytics.roi_between(from, to);

    if output::is_json() {
        output::json_output(json!({
            "command": "stats",
            "runs": runs.len(),
            "bets": bets,
            "strategies": performance,
            "win_rate_by_kind": by_kind,
            "roi": roi,
        }));
        return Ok(());
    }

    output::section("Strategy Performance");
    if performance.is_empty() {
        output::warning("No settled bets in stored backtest runs");
        output::hint("run `oddsline backtest` first");
        return Ok(());
    }
    output::field("Runs", runs.len());
    output::field("Bets", bets);

    let rows: Vec<PerformanceRow> = performance.iter().map(PerformanceRow::from).collect();
    output::lines(&Table::new(rows).to_string());

    output::section("Win Rate by Type");
    for (kind, rate) in &by_kind {
        output::field(kind, format!("{:.1}%", rate * 100.0));
    }

    let label = match (args.from, args.to) {
        (None, None) => "ROI".to_string(),
        (from, to) => format!(
            "ROI {}..{}",
            from.map_or_else(String::new, |d| d.to_string()),
            to.map_or_else(String::new, |d| d.to_string())
        ),
    };
    output::section("Return");
    output::field(&label, format!("{:.2}%", roi * 100.0));
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::StrategyType;
    use crate::testkit::domain::backtest_result;

    #[test]
    fn window_covers_whole_days() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let (start, end) = window(Some(day(2)), Some(day(3)));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert!(end > Utc.with_ymd_and_hms(2024, 1, 3, 23, 59, 59).unwrap());
        assert!(end < Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap());

        let (start, end) = window(None, None);
        assert_eq!(start, DateTime::<Utc>::MIN_UTC);
        assert_eq!(end, DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn ingested_runs_feed_every_report() {
        let analytics = AnalyticsService::new();
        for run in [backtest_result("value", 2), backtest_result("value", 1)] {
            analytics.ingest_backtest(&run);
        }
        let performance = analytics.all_performance();
        assert_eq!(performance.len(), 1);
        assert_eq!(performance[0].total_bets, 3);

        let by_kind = kind_win_rates(&analytics, &performance);
        assert_eq!(by_kind.len(), 1);
        assert_eq!(by_kind[&StrategyType::ValueBetting.to_string()], 1.0);

        // bets settle on Jan 1 and Jan 2; only the Jan 2 stake (20) is in range
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let (from, to) = window(Some(day(2)), Some(day(2)));
        assert!((analytics.roi_between(from, to) - 1.0).abs() < 1e-12);

        let row = PerformanceRow::from(&performance[0]);
        assert_eq!(row.win_rate, "100.0");
        assert_eq!(row.roi, "100.00");
        assert_eq!(row.risk, "MEDIUM (max MEDIUM)");
    }
}
