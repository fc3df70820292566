//! CLI module graph.

pub mod backtest;
pub mod check;
pub mod command;
pub mod compare;
pub mod output;
pub mod results;
pub mod run;
pub mod stats;

use std::path::Path;

use crate::error::Result;
use crate::infrastructure::config::Config;

pub use command::{Cli, Commands};

/// Execute a parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    output::configure(output::OutputConfig::new(cli.json, cli.quiet, cli.verbose));
    match cli.command {
        Commands::Run(args) => run::execute(&args).await,
        Commands::Backtest(args) => backtest::execute(&args).await,
        Commands::Results(args) => results::execute(&args).await,
        Commands::Compare(args) => compare::execute(&args).await,
        Commands::Stats(args) => stats::execute(&args).await,
        Commands::Check(args) => check::execute(&args.config),
    }
}

/// Load the configuration and apply a database override.
pub(crate) fn load_config(path: &Path, database: Option<&str>) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(database) = database {
        config.backtest.database = database.to_string();
    }
    Ok(config)
}
