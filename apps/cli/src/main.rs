//! hirepipe CLI: drive the recruitment pipeline from the terminal.
//!
//! Summarize a job description, match a CV against it, and send an
//! interview invitation, with intermediate results kept per session.

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
