//! Stage 2: send an interview invitation for the stored score.

use hirepipe_shared::{HirePipeError, InvitationReceipt, Result, StageId};
use tracing::{info, instrument, warn};

use super::{Stage, StageCompletion, StageResult, StageStatus, refuse};
use crate::report::needs_review_warning;
use crate::session::SessionContext;

const MISSING_FIELDS: &str = "Please fill in both name and email";
const FALLBACK: &str = "Failed to send invitation";

/// What the operator sees after a successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct InterviewOutcome {
    pub receipt: InvitationReceipt,
    /// Score the invitation was sent with.
    pub score: f64,
    /// The score is low enough to show the review warning.
    pub review_warning: bool,
}

/// Candidate contact form plus the score read from the store.
#[derive(Debug, Default)]
pub struct InterviewStage {
    name: String,
    email: String,
    status: StageStatus,
    stored_score: f64,
    outcome: Option<InterviewOutcome>,
}

impl InterviewStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        if !self.status.is_loading() {
            self.name = name.into();
        }
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        if !self.status.is_loading() {
            self.email = email.into();
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Score read from the store on the last refresh or send.
    pub fn stored_score(&self) -> f64 {
        self.stored_score
    }

    /// Whether the review warning applies to the current score.
    pub fn review_warning(&self) -> bool {
        needs_review_warning(self.stored_score)
    }

    pub fn outcome(&self) -> Option<&InterviewOutcome> {
        self.outcome.as_ref()
    }

    /// Re-read the stored score. Called whenever the stage is entered.
    pub async fn refresh(&mut self, ctx: &SessionContext) -> Result<()> {
        self.stored_score = ctx.store().read_score().await?;
        Ok(())
    }

    pub fn begin(&mut self) -> Result<InvitationJob> {
        if self.status.is_loading() {
            return Err(HirePipeError::validation("An invitation is already being sent"));
        }
        if !self.inputs_valid() {
            return Err(refuse(&mut self.status, MISSING_FIELDS));
        }

        self.status = StageStatus::Loading;
        self.outcome = None;
        Ok(InvitationJob {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
        })
    }

    pub fn finish(&mut self, outcome: &Result<StageCompletion>) {
        match outcome {
            Ok(StageCompletion {
                result: StageResult::Invitation(sent),
                ..
            }) => {
                self.stored_score = sent.score;
                self.outcome = Some(sent.clone());
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

impl Stage for InterviewStage {
    fn id(&self) -> StageId {
        StageId::Interview
    }

    fn inputs_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }

    fn status(&self) -> &StageStatus {
        &self.status
    }
}

/// Owned snapshot of an invitation send.
#[derive(Debug, Clone)]
pub struct InvitationJob {
    name: String,
    email: String,
}

impl InvitationJob {
    /// Send with the score stored at dispatch time, not the one last displayed.
    #[instrument(skip_all, fields(session = %ctx.session()))]
    pub async fn run(self, ctx: &SessionContext) -> Result<StageCompletion> {
        let score = ctx.store().read_score().await?;
        let receipt = ctx
            .client()
            .send_interview_invitation(&self.email, &self.name, score)
            .await?;

        info!(score, "interview stage finished");
        Ok(StageCompletion {
            stage: StageId::Interview,
            result: StageResult::Invitation(InterviewOutcome {
                receipt,
                score,
                review_warning: needs_review_warning(score),
            }),
            superseded: false,
        })
    }
}
