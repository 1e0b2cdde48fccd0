//! Stage 0: summarize a job description.

use hirepipe_shared::{HirePipeError, JdInput, JobSummary, Result, StageId, UploadedFile};
use hirepipe_storage::WriteOutcome;
use tracing::{info, instrument, warn};

use super::{Stage, StageCompletion, StageResult, StageStatus, refuse};
use crate::preview::{PreviewTracker, SelectedFile};
use crate::session::SessionContext;

const MISSING_INPUT: &str = "Please upload a job description or paste its text";
const FALLBACK: &str = "Summarization failed. Please try again.";

/// Job description input (file XOR pasted text) and the latest summary.
#[derive(Debug, Default)]
pub struct JobSummaryStage {
    file: Option<SelectedFile>,
    text: String,
    status: StageStatus,
    summary: Option<JobSummary>,
    previews: PreviewTracker,
}

impl JobSummaryStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a file. Clears any pasted text and releases the old preview.
    pub fn select_file(&mut self, file: UploadedFile) {
        if self.status.is_loading() {
            return;
        }
        self.text.clear();
        self.file = Some(SelectedFile::new(file, &self.previews));
    }

    pub fn clear_file(&mut self) {
        if !self.status.is_loading() {
            self.file = None;
        }
    }

    /// Replace the pasted text. Non-blank text deselects the file.
    pub fn set_text(&mut self, text: impl Into<String>) {
        if self.status.is_loading() {
            return;
        }
        self.text = text.into();
        if !self.text.trim().is_empty() {
            self.file = None;
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    /// The summary of the last successful run.
    pub fn summary(&self) -> Option<&JobSummary> {
        self.summary.as_ref()
    }

    pub fn previews(&self) -> &PreviewTracker {
        &self.previews
    }

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------

    pub fn begin(&mut self) -> Result<SummarizeJob> {
        if self.status.is_loading() {
            return Err(HirePipeError::validation("Summarization is already running"));
        }

        let input = match (&self.file, self.text.trim().is_empty()) {
            (Some(selected), _) => JdInput::File(selected.file.clone()),
            (None, false) => JdInput::Text(self.text.clone()),
            (None, true) => return Err(refuse(&mut self.status, MISSING_INPUT)),
        };

        self.status = StageStatus::Loading;
        self.summary = None;
        Ok(SummarizeJob { input })
    }

    pub fn finish(&mut self, outcome: &Result<StageCompletion>) {
        match outcome {
            Ok(StageCompletion {
                result: StageResult::Summary(summary),
                ..
            }) => {
                self.summary = Some(summary.clone());
                self.status = StageStatus::Success;
            }
            Ok(other) => {
                warn!(stage = %other.stage, "ignoring completion for another stage");
            }
            Err(e) => {
                self.status = StageStatus::Error(e.user_message(FALLBACK));
            }
        }
    }

    pub async fn execute(&mut self, ctx: &SessionContext) -> Result<StageCompletion> {
        let job = self.begin()?;
        let outcome = job.run(ctx).await;
        self.finish(&outcome);
        outcome
    }
}

impl Stage for JobSummaryStage {
    fn id(&self) -> StageId {
        StageId::JobSummary
    }

    fn inputs_valid(&self) -> bool {
        self.file.is_some() || !self.text.trim().is_empty()
    }

    fn status(&self) -> &StageStatus {
        &self.status
    }
}

/// Owned snapshot of a summarization run.
#[derive(Debug, Clone)]
pub struct SummarizeJob {
    input: JdInput,
}

impl SummarizeJob {
    #[instrument(skip_all, fields(session = %ctx.session()))]
    pub async fn run(self, ctx: &SessionContext) -> Result<StageCompletion> {
        let ticket = ctx.store().issue_ticket().await?;
        let summary = ctx.client().summarize_job_description(&self.input).await?;
        let outcome = ctx.store().write_summary(&summary, ticket).await?;

        info!(%ticket, ?outcome, "job summary stage finished");
        Ok(StageCompletion {
            stage: StageId::JobSummary,
            result: StageResult::Summary(summary),
            superseded: outcome == WriteOutcome::Superseded,
        })
    }
}
