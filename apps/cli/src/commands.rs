//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use hirepipe_core::report::{MatchReport, REVIEW_WARNING, Recommendation, format_percent};
use hirepipe_core::stages::{CandidateMatchStage, InterviewStage, JobSummaryStage};
use hirepipe_core::{
    ProgressReporter, RunRequest, SessionContext, Stage, StageCompletion, StageResult,
    StageStatus, run_pipeline,
};
use hirepipe_shared::{
    ApiSettings, AppConfig, JdInput, SessionName, StageId, UploadKind, UploadedFile,
    config_file_path, expand_home, init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// hirepipe: summarize a job description, match a candidate, invite to interview.
#[derive(Parser)]
#[command(
    name = "hirepipe",
    version,
    about = "Drive an AI-assisted recruitment pipeline from the terminal.",
    long_about = None,
)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every command that touches a session.
#[derive(Args, Clone, Debug)]
pub(crate) struct GlobalArgs {
    /// Session whose stored summary and score are used.
    #[arg(long, global = true)]
    pub session: Option<String>,

    /// Backend base URL (overrides env and config file).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Stage store database path.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Job description source: a file or pasted text, never both.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub(crate) struct JdSource {
    /// Job description file (pdf, txt, md, doc, docx).
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Job description text.
    #[arg(long)]
    pub text: Option<String>,
}

/// Job description source for `run`.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub(crate) struct RunJdSource {
    /// Job description file (pdf, txt, md, doc, docx).
    #[arg(long)]
    pub jd_file: Option<PathBuf>,

    /// Job description text.
    #[arg(long)]
    pub jd_text: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Summarize a job description and store the summary.
    Summarize {
        #[command(flatten)]
        source: JdSource,
    },

    /// Match a CV against the stored job summary and store the score.
    Match {
        /// CV file (pdf, doc, docx, txt).
        #[arg(long)]
        cv: PathBuf,
    },

    /// Send an interview invitation with the stored score.
    Invite {
        /// Candidate name.
        #[arg(long)]
        name: String,

        /// Candidate email.
        #[arg(long)]
        email: String,
    },

    /// Run every stage in order and print the pipeline summary.
    Run {
        /// CV file (pdf, doc, docx, txt).
        #[arg(long)]
        cv: PathBuf,

        #[command(flatten)]
        jd: RunJdSource,

        /// Candidate name; with --email, also sends the invitation.
        #[arg(long, requires = "email")]
        name: Option<String>,

        /// Candidate email.
        #[arg(long, requires = "name")]
        email: Option<String>,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the stored summary and score for the session.
    Status,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "hirepipe=warn",
        1 => "hirepipe=info",
        2 => "hirepipe=debug",
        _ => "hirepipe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let global = cli.global;
    match cli.command {
        Command::Summarize { source } => cmd_summarize(&global, source).await,
        Command::Match { cv } => cmd_match(&global, cv).await,
        Command::Invite { name, email } => cmd_invite(&global, name, email).await,
        Command::Run {
            cv,
            jd,
            name,
            email,
            json,
        } => {
            let invite = name.zip(email);
            cmd_run(&global, cv, jd, invite, json).await
        }
        Command::Status => cmd_status(&global).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&global).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Session setup
// ---------------------------------------------------------------------------

fn resolve_db_path(global: &GlobalArgs, config: &AppConfig) -> Result<PathBuf> {
    match &global.db {
        Some(path) => Ok(path.clone()),
        None => Ok(expand_home(&config.storage.db_path)?),
    }
}

fn resolve_session(global: &GlobalArgs, config: &AppConfig) -> Result<SessionName> {
    let name = global
        .session
        .clone()
        .unwrap_or_else(|| config.session.default_name.clone());
    Ok(SessionName::named(name)?)
}

async fn open_session(global: &GlobalArgs) -> Result<Arc<SessionContext>> {
    let config = load_config()?;
    let settings = ApiSettings::from_env(&config, global.api_url.as_deref())?;
    let db_path = resolve_db_path(global, &config)?;
    let session = resolve_session(global, &config)?;
    Ok(SessionContext::open(&db_path, session, &settings).await?)
}

fn read_jd(file: Option<PathBuf>, text: Option<String>) -> Result<JdInput> {
    match (file, text) {
        (Some(path), _) => Ok(JdInput::File(UploadedFile::read(
            UploadKind::JobDescription,
            &path,
        )?)),
        (None, Some(text)) => Ok(JdInput::Text(text)),
        (None, None) => Err(eyre!("provide a job description file or text")),
    }
}

/// The stage's inline error as a command failure.
fn stage_failure(status: &StageStatus) -> color_eyre::eyre::Report {
    eyre!("{}", status.error().unwrap_or("stage failed"))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_summarize(global: &GlobalArgs, source: JdSource) -> Result<()> {
    let ctx = open_session(global).await?;
    let mut stage = JobSummaryStage::new();
    match read_jd(source.file, source.text)? {
        JdInput::File(file) => stage.select_file(file),
        JdInput::Text(text) => stage.set_text(text),
    }

    let progress = CliProgress::new();
    progress.stage_started(StageId::JobSummary);
    let result = stage.execute(&ctx).await;
    progress.clear();

    let completion = result.map_err(|_| stage_failure(stage.status()))?;
    print_superseded(&completion);
    if let Some(summary) = stage.summary() {
        println!("{}", summary.text);
    }
    Ok(())
}

async fn cmd_match(global: &GlobalArgs, cv: PathBuf) -> Result<()> {
    let ctx = open_session(global).await?;
    let mut stage = CandidateMatchStage::new();
    stage.select_cv(UploadedFile::read(UploadKind::Cv, &cv)?);

    let progress = CliProgress::new();
    progress.stage_started(StageId::CandidateMatch);
    let result = stage.execute(&ctx).await;
    progress.clear();

    let completion = result.map_err(|_| stage_failure(stage.status()))?;
    print_superseded(&completion);
    if let Some(result) = stage.result() {
        print_match_report(&MatchReport::from(result));
    }
    Ok(())
}

async fn cmd_invite(global: &GlobalArgs, name: String, email: String) -> Result<()> {
    let ctx = open_session(global).await?;
    let mut stage = InterviewStage::new();
    stage.refresh(&ctx).await?;
    stage.set_name(name);
    stage.set_email(email);

    let progress = CliProgress::new();
    progress.stage_started(StageId::Interview);
    let result = stage.execute(&ctx).await;
    progress.clear();

    if stage.review_warning() {
        eprintln!("{REVIEW_WARNING}");
    }

    result.map_err(|_| stage_failure(stage.status()))?;
    if let Some(outcome) = stage.outcome() {
        println!(
            "{} (score {})",
            outcome.receipt.message,
            format_percent(outcome.score)
        );
    }
    Ok(())
}

async fn cmd_run(
    global: &GlobalArgs,
    cv: PathBuf,
    jd: RunJdSource,
    invite: Option<(String, String)>,
    json: bool,
) -> Result<()> {
    let ctx = open_session(global).await?;
    let request = RunRequest {
        jd: read_jd(jd.jd_file, jd.jd_text)?,
        cv: UploadedFile::read(UploadKind::Cv, &cv)?,
        invite,
    };

    info!(session = %ctx.session(), "running full pipeline");
    let progress = CliProgress::new();
    let result = run_pipeline(&ctx, request, &progress).await;
    progress.clear();

    let summary = result?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}

async fn cmd_status(global: &GlobalArgs) -> Result<()> {
    let ctx = open_session(global).await?;
    let summary = ctx.store().read_summary().await?;
    let score = ctx.store().read_score().await?;

    println!("Session: {}", ctx.session());
    println!();
    println!("Job summary:");
    if summary.is_empty() {
        println!("  (none)");
    } else {
        for line in summary.text.lines() {
            println!("  {line}");
        }
    }
    println!();

    match Recommendation::for_stored_score(score) {
        Some(tier) => {
            println!("Match score: {}  {tier}", format_percent(score));
            println!("  {}", tier.verdict());
        }
        None => println!("Match score: (none)"),
    }

    if hirepipe_core::report::needs_review_warning(score) {
        println!();
        println!("{REVIEW_WARNING}");
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(global: &GlobalArgs) -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("# {}", config_file_path()?.display());
    println!("{toml_str}");

    let settings = ApiSettings::from_env(&config, global.api_url.as_deref())?;
    println!("# resolved");
    println!("# api base_url = {}", settings.base_url);
    println!("# db path      = {}", resolve_db_path(global, &config)?.display());
    println!("# session      = {}", resolve_session(global, &config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_superseded(completion: &StageCompletion) {
    if completion.superseded {
        eprintln!(
            "note: a newer run already stored its result; {} result was not saved",
            completion.stage
        );
    }
}

fn print_match_report(report: &MatchReport) {
    println!(
        "Match score:  {}  {}",
        report.score_label, report.recommendation
    );
    println!("  {}", report.verdict);
    println!();
    println!("Skills:       {}", report.skills_label);
    println!("Experience:   {}", report.experience_label);
    println!("Education:    {}", report.education_label);
    println!(
        "Keywords:     {} ({})",
        report.keywords_label,
        format_percent(report.keyword_ratio * 100.0)
    );
    println!();

    match report.breakdown_notice {
        Some(notice) => println!("{notice}"),
        None => {
            println!("Skill breakdown:");
            for row in &report.skills {
                let mark = if row.found { "✓" } else { "✗" };
                println!("  {mark} {:<24} {:>4}", row.skill, row.label);
            }
        }
    }

    if let Some(analysis) = &report.analysis {
        println!();
        println!("Analysis:");
        for line in analysis.lines() {
            println!("  {line}");
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: StageId) {
        let message = match stage {
            StageId::JobSummary => "Summarizing job description",
            StageId::CandidateMatch => "Parsing and matching CV",
            StageId::Interview => "Sending interview invitation",
        };
        self.spinner.set_message(message);
    }

    fn stage_finished(&self, completion: &StageCompletion) {
        let detail = match &completion.result {
            StageResult::Summary(_) => "summary stored".to_string(),
            StageResult::Match(result) => format!("score {}", format_percent(result.match_score)),
            StageResult::Invitation(sent) => sent.receipt.message.clone(),
        };
        self.spinner
            .println(format!("✓ {}: {detail}", completion.stage));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn summarize_takes_exactly_one_source() {
        assert!(Cli::try_parse_from(["hirepipe", "summarize", "--text", "Go role"]).is_ok());
        assert!(Cli::try_parse_from(["hirepipe", "summarize"]).is_err());
        assert!(
            Cli::try_parse_from(["hirepipe", "summarize", "--text", "a", "--file", "jd.txt"])
                .is_err()
        );
    }

    #[test]
    fn run_requires_name_and_email_together() {
        let base = ["hirepipe", "run", "--cv", "cv.pdf", "--jd-text", "Go role"];
        assert!(Cli::try_parse_from(base).is_ok());

        let mut with_name = base.to_vec();
        with_name.extend(["--name", "Jane"]);
        assert!(Cli::try_parse_from(with_name).is_err());

        let mut both = base.to_vec();
        both.extend(["--name", "Jane", "--email", "jane@example.com"]);
        assert!(Cli::try_parse_from(both).is_ok());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "hirepipe",
            "status",
            "--session",
            "screening",
            "--api-url",
            "http://backend:8000",
        ])
        .unwrap();
        assert_eq!(cli.global.session.as_deref(), Some("screening"));
        assert_eq!(cli.global.api_url.as_deref(), Some("http://backend:8000"));
    }

    #[test]
    fn session_and_db_resolution() {
        let config = AppConfig::default();
        let global = GlobalArgs {
            session: None,
            api_url: None,
            db: Some(PathBuf::from("/tmp/x.db")),
        };
        assert_eq!(resolve_session(&global, &config).unwrap().as_str(), "default");
        assert_eq!(resolve_db_path(&global, &config).unwrap(), PathBuf::from("/tmp/x.db"));
    }
}
