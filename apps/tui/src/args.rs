//! Command-line flags for the TUI.

use std::path::PathBuf;

use clap::Parser;
use hirepipe_shared::{AppConfig, SessionName, expand_home};

/// hirepipe TUI: summarize, match and invite from the terminal.
#[derive(Parser, Debug)]
#[command(name = "hirepipe-tui", version, about)]
pub(crate) struct TuiArgs {
    /// Attach to an existing session. A fresh session is started otherwise.
    #[arg(long)]
    pub session: Option<String>,

    /// Backend base URL (overrides env and config file).
    #[arg(long)]
    pub api_url: Option<String>,

    /// Stage store database path.
    #[arg(long)]
    pub db: Option<PathBuf>,
}

impl TuiArgs {
    /// Session to open; each launch without `--session` gets its own.
    pub(crate) fn session(&self) -> hirepipe_shared::Result<SessionName> {
        match &self.session {
            Some(name) => SessionName::named(name.clone()),
            None => Ok(SessionName::generate()),
        }
    }

    pub(crate) fn db_path(&self, config: &AppConfig) -> hirepipe_shared::Result<PathBuf> {
        match &self.db {
            Some(path) => Ok(path.clone()),
            None => expand_home(&config.storage.db_path),
        }
    }
}
