//! brandctx CLI: create, inspect, and move the company Context Document.
//!
//! Every generated asset is personalized from this one document; the CLI is
//! a thin consumer of `brandctx_core::ContextStore`.

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
