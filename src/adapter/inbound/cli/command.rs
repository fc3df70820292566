//! Command-line interface definitions.
//!
//! Defines the CLI structure for the oddsline binary using `clap`. The
//! subcommands run the live pipeline, replay strategies over history and
//! report on persisted backtest runs.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::domain::StakingMethod;

/// Default configuration file path.
pub const DEFAULT_CONFIG: &str = "oddsline.toml";

/// Sports odds streaming, strategy evaluation and backtesting
#[derive(Parser, Debug)]
#[command(name = "oddsline")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream odds and evaluate strategies until interrupted
    Run(RunArgs),

    /// Replay a configured strategy over historical odds
    Backtest(Box<BacktestArgs>),

    /// Show persisted backtest runs
    Results(ResultsArgs),

    /// Compare strategies across their persisted runs
    Compare(CompareArgs),

    /// Report win rates, ROI and risk over persisted backtest runs
    Stats(StatsArgs),

    /// Validate the configuration file
    Check(ConfigPathArg),
}

/// Shared argument struct for commands that require only a configuration path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Additional market to subscribe to (repeatable).
    #[arg(long = "market", value_name = "MARKET_ID")]
    pub markets: Vec<String>,

    /// Override the log level from the config file.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    pub json_logs: bool,
}

/// Stake sizing for replayed bets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StakingArg {
    /// Fraction of the initial bankroll
    #[default]
    Fixed,
    /// Fraction of the current bankroll
    Percentage,
    /// Kelly stake scaled by the fraction
    Kelly,
}

/// Arguments for the `backtest` subcommand.
#[derive(Parser, Debug)]
pub struct BacktestArgs {
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Id of a strategy defined in the configuration.
    #[arg(short, long)]
    pub strategy: String,

    /// First match date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub from: NaiveDate,

    /// Last match date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub to: NaiveDate,

    #[arg(long, default_value = "1000")]
    pub bankroll: Decimal,

    #[arg(long, value_enum, default_value_t = StakingArg::Fixed)]
    pub staking: StakingArg,

    /// Staking fraction, or the Kelly multiplier with `--staking kelly`.
    #[arg(long, default_value = "0.02")]
    pub fraction: Decimal,

    /// Only replay these sports (repeatable).
    #[arg(long = "sport")]
    pub sports: Vec<String>,

    /// Only replay these leagues (repeatable).
    #[arg(long = "league")]
    pub leagues: Vec<String>,

    #[arg(long)]
    pub min_odds: Option<Decimal>,

    #[arg(long)]
    pub max_odds: Option<Decimal>,

    /// Report drawdown as a ratio of the peak.
    #[arg(long)]
    pub drawdown_ratio: bool,

    /// Historical data file, overriding `backtest.data_path`.
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Database path, overriding `backtest.database`.
    #[arg(long)]
    pub database: Option<String>,
}

impl BacktestArgs {
    #[must_use]
    pub fn staking_method(&self) -> StakingMethod {
        match self.staking {
            StakingArg::Fixed => StakingMethod::Fixed {
                fraction: self.fraction,
            },
            StakingArg::Percentage => StakingMethod::Percentage {
                fraction: self.fraction,
            },
            StakingArg::Kelly => StakingMethod::Kelly {
                multiplier: self.fraction,
            },
        }
    }
}

/// Arguments for the `results` subcommand.
#[derive(Parser, Debug)]
pub struct ResultsArgs {
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Show one run in detail.
    pub id: Option<String>,

    /// Only list runs of this strategy.
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Database path, overriding `backtest.database`.
    #[arg(long)]
    pub database: Option<String>,
}

/// Arguments for the `compare` subcommand.
#[derive(Parser, Debug)]
pub struct CompareArgs {
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Strategy ids to compare, in display order.
    #[arg(required = true, num_args = 1..)]
    pub strategies: Vec<String>,

    /// Database path, overriding `backtest.database`.
    #[arg(long)]
    pub database: Option<String>,
}

/// Arguments for the `stats` subcommand.
#[derive(Parser, Debug)]
pub struct StatsArgs {
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Only report runs of this strategy.
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Start of the ROI window (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// End of the ROI window (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Database path, overriding `backtest.database`.
    #[arg(long)]
    pub database: Option<String>,
}


#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn run_defaults() {
        let cli = parse(&["oddsline", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG));
        assert!(args.markets.is_empty());
        assert!(!args.json_logs);
    }

    #[test]
    fn run_collects_markets() {
        let cli = parse(&["oddsline", "run", "--market", "1.1", "--market", "1.2"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.markets, ["1.1", "1.2"]);
    }

    #[test]
    fn backtest_parses_dates_and_staking() {
        let cli = parse(&[
            "oddsline",
            "backtest",
            "--strategy",
            "kelly",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
            "--staking",
            "kelly",
            "--fraction",
            "0.5",
            "--sport",
            "soccer",
        ]);
        let Commands::Backtest(args) = cli.command else {
            panic!("expected backtest");
        };
        assert_eq!(args.from, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(args.bankroll, dec!(1000));
        assert_eq!(args.sports, ["soccer"]);
        assert_eq!(
            args.staking_method(),
            StakingMethod::Kelly {
                multiplier: dec!(0.5)
            }
        );
    }

    #[test]
    fn backtest_requires_strategy_and_range() {
        assert!(Cli::try_parse_from(["oddsline", "backtest", "--from", "2024-01-01"]).is_err());
    }

    #[test]
    fn backtest_rejects_bad_date() {
        assert!(Cli::try_parse_from([
            "oddsline", "backtest", "-s", "x", "--from", "yesterday", "--to", "2024-01-01",
        ])
        .is_err());
    }

    #[test]
    fn compare_requires_a_strategy() {
        assert!(Cli::try_parse_from(["oddsline", "compare"]).is_err());
        let cli = parse(&["oddsline", "compare", "a", "b"]);
        let Commands::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.strategies, ["a", "b"]);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["oddsline", "results", "--json", "-vv"]);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn stats_takes_an_optional_window() {
        let cli = parse(&["oddsline", "stats", "--from", "2024-03-01", "-s", "arb"]);
        let Commands::Stats(args) = cli.command else {
            panic!("expected stats");
        };
        assert_eq!(args.from, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(args.to.is_none());
        assert_eq!(args.strategy.as_deref(), Some("arb"));
    }
}
