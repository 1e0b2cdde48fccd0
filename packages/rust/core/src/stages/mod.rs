//! The three pipeline stages.
//!
//! Every stage runs in three steps so it fits an event loop:
//!
//! 1. `begin()` checks the local inputs and snapshots them into an owned job,
//!    flipping the stage to [`StageStatus::Loading`].
//! 2. The job's `run(&SessionContext)` does the store reads, remote calls and
//!    stamped store write. It owns its data and can be spawned.
//! 3. `finish()` applies the outcome back to the stage.
//!
//! `execute()` composes the three for callers that simply await.

mod candidate_match;
mod interview;
mod job_summary;

pub use candidate_match::{CandidateMatchStage, MatchJob, NO_SUMMARY};
pub use interview::{InterviewOutcome, InterviewStage, InvitationJob};
pub use job_summary::{JobSummaryStage, SummarizeJob};

use hirepipe_shared::{HirePipeError, JobSummary, MatchResult, Result, StageId};

use crate::session::SessionContext;

/// Visual state of a stage, derived from its last run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StageStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error(String),
}

impl StageStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// Shared surface of the three stages.
pub trait Stage {
    fn id(&self) -> StageId;

    /// Whether the local inputs are complete enough to start a run.
    fn inputs_valid(&self) -> bool;

    fn status(&self) -> &StageStatus;
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult {
    Summary(JobSummary),
    Match(MatchResult),
    Invitation(InterviewOutcome),
}

/// A finished run, ready for the pipeline controller.
#[derive(Debug, Clone, PartialEq)]
pub struct StageCompletion {
    pub stage: StageId,
    pub result: StageResult,
    /// The store write lost to a newer run of this or a later stage.
    pub superseded: bool,
}

/// Any stage's owned job, for front ends that dispatch runs generically.
#[derive(Debug, Clone)]
pub enum StageJob {
    Summarize(SummarizeJob),
    Match(MatchJob),
    Invite(InvitationJob),
}

impl StageJob {
    pub fn stage(&self) -> StageId {
        match self {
            Self::Summarize(_) => StageId::JobSummary,
            Self::Match(_) => StageId::CandidateMatch,
            Self::Invite(_) => StageId::Interview,
        }
    }

    pub async fn run(self, ctx: &SessionContext) -> Result<StageCompletion> {
        match self {
            Self::Summarize(job) => job.run(ctx).await,
            Self::Match(job) => job.run(ctx).await,
            Self::Invite(job) => job.run(ctx).await,
        }
    }
}

/// Refuse a run: record the message on the stage and hand back the error.
fn refuse(status: &mut StageStatus, message: &str) -> HirePipeError {
    *status = StageStatus::Error(message.to_string());
    HirePipeError::validation(message)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use hirepipe_client::ApiClient;
    use hirepipe_shared::{ApiSettings, SessionName};
    use hirepipe_storage::StageStore;
    use uuid::Uuid;

    use crate::session::SessionContext;

    pub fn temp_db() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("hp_core_test_{}.db", Uuid::now_v7()))
    }

    /// A fresh session against `base_url` on a throwaway database.
    pub async fn context(base_url: &str) -> Arc<SessionContext> {
        let store = StageStore::open(&temp_db(), SessionName::generate())
            .await
            .expect("open store");
        let client = ApiClient::new(&ApiSettings::new(base_url).expect("url")).expect("client");
        Arc::new(SessionContext::new(store, client))
    }
}
