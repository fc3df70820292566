use clap::Parser;
use oddsline::adapter::inbound::cli::{self, output, Cli};

async fn run(cli: Cli) -> anyhow::Result<()> {
    cli::execute(cli).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let _ = rustls::crypto::ring::default_provider().install_default();

    if let Err(e) = run(Cli::parse()).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}
