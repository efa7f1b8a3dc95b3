//! webcontext CLI: search the web and print ranked context passages.
//!
//! Runs the retrieval pipeline against the configured search provider,
//! page fetcher, and embedding model.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
