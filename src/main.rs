use clap::Parser;
use coinledger::cli::{execute, Cli};
use coinledger::{LedgerService, SledStore};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let store = SledStore::open(&cli.data_dir)?;
    let ledger = LedgerService::open(Arc::new(store), cli.config()).await?;

    match execute(&ledger, &cli.command).await {
        Ok(reply) => {
            println!("{}", reply);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, transient = e.is_transient(), "command failed");
            println!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
