//! Core TUI application state and event loop.
//!
//! The UI thread owns the [`Pipeline`]. Stage runs are spawned on a tokio
//! runtime and report back over an mpsc channel, so navigation stays live
//! while a call is in flight and a late completion still lands in its stage.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use hirepipe_core::{Pipeline, SessionContext, Stage, StageCompletion, StageStatus, Transition};
use hirepipe_shared::{ApiSettings, StageId, config_dir, load_config};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Tabs};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

use crate::args::TuiArgs;
use crate::screens::Screens;
use crate::widgets::status_bar;

/// Log file written in the config directory; the terminal belongs to the UI.
const LOG_FILE_NAME: &str = "hirepipe-tui.log";

/// Messages from background tasks to the UI thread.
pub(crate) enum AppMessage {
    Finished {
        stage: StageId,
        outcome: hirepipe_shared::Result<StageCompletion>,
    },
}

/// Application state.
pub(crate) struct App {
    /// Controller plus the three stage components.
    pub pipeline: Pipeline,
    /// Per-screen UI state.
    pub screens: Screens,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Status message shown in bottom bar.
    pub status: String,
    /// Whether help overlay is visible.
    pub show_help: bool,
    ctx: Arc<SessionContext>,
    runtime: Handle,
    tx: UnboundedSender<AppMessage>,
}

impl App {
    pub(crate) fn new(
        ctx: Arc<SessionContext>,
        runtime: Handle,
        tx: UnboundedSender<AppMessage>,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(),
            screens: Screens::new(),
            should_quit: false,
            status: format!("Session {} · press ? for help", ctx.session()),
            show_help: false,
            ctx,
            runtime,
            tx,
        }
    }

    fn active(&self) -> StageId {
        self.pipeline.controller.active()
    }

    fn is_editing(&self) -> bool {
        self.screens.is_editing(self.active())
    }

    fn stage_status(&self, stage: StageId) -> &StageStatus {
        match stage {
            StageId::JobSummary => self.pipeline.job_summary.status(),
            StageId::CandidateMatch => self.pipeline.candidate_match.status(),
            StageId::Interview => self.pipeline.interview.status(),
        }
    }

    fn navigate(&mut self, stage: StageId) {
        let transition = self.pipeline.controller.navigate(stage);
        self.status = stage.to_string();
        self.enter(transition);
    }

    /// Re-read the store when a transition enters a dependent stage.
    fn enter(&mut self, transition: Transition) {
        let result = self
            .runtime
            .block_on(self.pipeline.enter(transition, &self.ctx));
        if let Err(e) = result {
            warn!(error = %e, stage = %transition.to, "stage refresh failed");
            self.status = format!("Could not read stored values: {e}");
        }
    }

    /// Start the active stage in the background.
    fn run_active(&mut self) {
        let job = match self.pipeline.begin_active() {
            Ok(job) => job,
            Err(e) => {
                self.status = e.user_message("This stage cannot run right now");
                return;
            }
        };

        let stage = job.stage();
        let ctx = Arc::clone(&self.ctx);
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let outcome = job.run(&ctx).await;
            if tx.send(AppMessage::Finished { stage, outcome }).is_err() {
                debug!(%stage, "UI closed before the run finished");
            }
        });

        info!(%stage, "stage run dispatched");
        self.status = format!("{stage}: running…");
    }

    fn proceed(&mut self) {
        let transition = self.pipeline.controller.proceed();
        if transition.changed() {
            self.status = transition.to.to_string();
            self.enter(transition);
        } else {
            self.status = "Run the candidate match before continuing".to_string();
        }
    }

    /// Apply a background message on the UI thread.
    fn apply(&mut self, message: AppMessage) {
        match message {
            AppMessage::Finished { stage, outcome } => {
                match self.pipeline.finish(stage, outcome) {
                    Ok((completion, transition)) => {
                        self.status = if completion.superseded {
                            format!("{stage}: a newer run already stored its result")
                        } else {
                            format!("{stage} complete")
                        };
                        let result = self.runtime.block_on(self.pipeline.settle(
                            &completion,
                            transition,
                            &self.ctx,
                        ));
                        if let Err(e) = result {
                            warn!(error = %e, "refresh after completion failed");
                            self.status = format!("Could not read stored values: {e}");
                        }
                    }
                    Err(_) => {
                        let message = self.stage_status(stage).error().unwrap_or("failed");
                        self.status = format!("{stage}: {message}");
                    }
                }
            }
        }
    }
}

/// Entry point: sets up logging, session and terminal, runs the event loop, restores terminal.
pub(crate) fn run(args: TuiArgs) -> Result<()> {
    init_logging()?;

    let config = load_config()?;
    let settings = ApiSettings::from_env(&config, args.api_url.as_deref())?;
    let db_path = args.db_path(&config)?;
    let session = args.session()?;
    info!(%session, db = %db_path.display(), "opening session");

    let runtime = Runtime::new()?;
    let ctx = runtime.block_on(SessionContext::open(&db_path, session, &settings))?;
    let (tx, rx) = unbounded_channel();
    let mut app = App::new(ctx, runtime.handle().clone(), tx);

    // Setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, &mut app, rx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn init_logging() -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hirepipe=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut rx: UnboundedReceiver<AppMessage>,
) -> Result<()> {
    loop {
        while let Ok(message) = rx.try_recv() {
            app.apply(message);
        }

        terminal.draw(|f| draw(f, app))?;

        // Poll for events with 100ms timeout for responsive UI
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                handle_key(app, key.code, key.modifiers);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let ctrl = modifiers.contains(KeyModifiers::CONTROL);

    // Global keybindings (always active)
    match code {
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('r') if ctrl => {
            app.run_active();
            return;
        }
        KeyCode::Char('q') if !app.is_editing() => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('?') if !app.is_editing() => {
            app.show_help = !app.show_help;
            return;
        }
        KeyCode::Esc if app.show_help => {
            app.show_help = false;
            return;
        }
        // Stage navigation with number keys
        KeyCode::Char(c @ '1'..='3') if !app.is_editing() => {
            let idx = (c as usize) - ('1' as usize);
            if let Some(stage) = StageId::from_index(idx) {
                app.navigate(stage);
            }
            return;
        }
        KeyCode::Char('c') if !app.is_editing() && app.active() == StageId::CandidateMatch => {
            app.proceed();
            return;
        }
        KeyCode::Right if !app.is_editing() => {
            let next = (app.active().index() + 1) % StageId::ALL.len();
            if let Some(stage) = StageId::from_index(next) {
                app.navigate(stage);
            }
            return;
        }
        KeyCode::Left if !app.is_editing() => {
            let len = StageId::ALL.len();
            let prev = (app.active().index() + len - 1) % len;
            if let Some(stage) = StageId::from_index(prev) {
                app.navigate(stage);
            }
            return;
        }
        _ => {}
    }

    // If help is showing, consume any key to dismiss
    if app.show_help {
        app.show_help = false;
        return;
    }

    // Delegate to current screen
    if let Some(status) = app
        .screens
        .handle_key(code, modifiers, &mut app.pipeline)
    {
        app.status = status;
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    // Tab bar with completion marks
    let tab_titles: Vec<Line> = StageId::ALL
        .iter()
        .map(|&stage| {
            let mark = if app.stage_status(stage).is_loading() {
                "…"
            } else if app.pipeline.controller.is_complete(stage) {
                "✓"
            } else {
                "·"
            };
            Line::from(format!("{mark} {}. {stage}", stage.index() + 1))
        })
        .collect();

    let tabs = Tabs::new(tab_titles)
        .block(Block::default().borders(Borders::ALL).title(" hirepipe "))
        .select(app.active().index())
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" │ ");

    f.render_widget(tabs, chunks[0]);

    // Content area: delegate to screen
    app.screens.draw(f, chunks[1], &app.pipeline);

    // Status bar
    let bar = status_bar(&app.status);
    f.render_widget(bar, chunks[2]);

    // Help overlay
    if app.show_help {
        draw_help_overlay(f);
    }
}

fn draw_help_overlay(f: &mut Frame) {
    let area = centered_rect(60, 60, f.area());

    let help_text = vec![
        Line::from("Keybindings").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from(""),
        Line::from("  1-3          Jump to stage"),
        Line::from("  ←/→          Previous/next stage"),
        Line::from("  Ctrl-R       Run the active stage"),
        Line::from("  c            Continue from Candidate Match"),
        Line::from("  ?            Toggle this help"),
        Line::from("  q / Ctrl-C   Quit"),
        Line::from(""),
        Line::from("Screen-specific:").style(Style::default().add_modifier(Modifier::BOLD)),
        Line::from("  Enter        Edit field / load file"),
        Line::from("  Esc          Stop editing"),
        Line::from("  Tab          Next input field"),
        Line::from("  Del          Clear selected file"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help · press any key to close ")
                .style(Style::default().bg(Color::DarkGray)),
        )
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));

    // Clear background
    f.render_widget(ratatui::widgets::Clear, area);
    f.render_widget(help, area);
}

/// Create a centered rectangle with percentage width and height.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
