//! hirepipe TUI: interactive terminal front end for the recruitment pipeline.
//!
//! One tab per stage (Job Summary, Candidate Match, Interview), built with
//! `ratatui` + `crossterm`. Stage runs happen in the background.

mod app;
mod args;
mod screens;
mod widgets;

use clap::Parser;
use color_eyre::eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = args::TuiArgs::parse();
    app::run(args)
}
