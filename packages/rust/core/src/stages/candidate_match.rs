//! Stage 1: parse a CV and score it against the stored job summary.

use hirepipe_shared::{HirePipeError, JobSummary, MatchResult, Result, StageId, UploadedFile};
use hirepipe_storage::WriteOutcome;
use tracing::{info, instrument, warn};

use super::{Stage, StageCompletion, StageResult, StageStatus, refuse};
use crate::preview::{PreviewTracker, SelectedFile};
use crate::session::SessionContext;

pub const NO_SUMMARY: &str = "Please summarize a job description first";
const NO_CV: &str = "Please upload a CV first";
const FALLBACK: &str = "Failed to match candidate. Please try again.";

/// CV input, the summary it will be matched against, and the last result.
#[derive(Debug, Default)]
pub struct CandidateMatchStage {
    cv: Option<SelectedFile>,
    status: StageStatus,
    result: Option<MatchResult>,
    stored_summary: JobSummary,
    previews: PreviewTracker,
}

impl CandidateMatchStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a CV. The previous score and error no longer apply.
    pub fn select_cv(&mut self, file: UploadedFile) {
        if self.status.is_loading() {
            return;
        }
        self.cv = Some(SelectedFile::new(file, &self.previews));
        self.result = None;
        self.status = StageStatus::Idle;
    }

    pub fn clear_cv(&mut self) {
        if !self.status.is_loading() {
            self.cv = None;
        }
    }

    pub fn cv(&self) -> Option<&SelectedFile> {
        self.cv.as_ref()
    }

    pub fn result(&self) -> Option<&MatchResult> {
        self.result.as_ref()
    }

    /// Summary read from the store on the last refresh.
    pub fn stored_summary(&self) -> &JobSummary {
        &self.stored_summary
    }

    pub fn previews(&self) -> &PreviewTracker {
        &self.previews
    }

    /// Re-read the stored summary. Called whenever the stage is entered.
    pub async fn refresh(&mut self, ctx: &SessionContext) -> Result<()> {
        self.stored_summary = ctx.store().read_summary().await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------

    pub fn begin(&mut self) -> Result<MatchJob> {
        if self.status.is_loading() {
            return Err(HirePipeError::validation("Matching is already running"));
        }
        let Some(selected) = &self.cv else {
            return Err(refuse(&mut self.status, NO_CV));
        };

        let job = MatchJob {
            cv: selected.file.clone(),
        };
        self.status = StageStatus::Loading;
        self.result = None;
        Ok(job)
    }

    pub fn finish(&mut self, outcome: &Result<StageCompletion>) {
        match outcome {
            Ok(StageCompletion {
                result: StageResult::Match(result),
                ..
            }) => {
                self.result = Some(result.clone());
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

impl Stage for CandidateMatchStage {
    fn id(&self) -> StageId {
        StageId::CandidateMatch
    }

    fn inputs_valid(&self) -> bool {
        self.cv.is_some()
    }

    fn status(&self) -> &StageStatus {
        &self.status
    }
}

/// Owned snapshot of a matching run.
#[derive(Debug, Clone)]
pub struct MatchJob {
    cv: UploadedFile,
}

impl MatchJob {
    /// Read the stored summary, parse the CV, match, and store the score.
    ///
    /// Refuses before any request when the stored summary is empty.
    #[instrument(skip_all, fields(session = %ctx.session()))]
    pub async fn run(self, ctx: &SessionContext) -> Result<StageCompletion> {
        let summary = ctx.store().read_summary().await?;
        if summary.is_empty() {
            return Err(HirePipeError::validation(NO_SUMMARY));
        }

        let ticket = ctx.store().issue_ticket().await?;
        info!(%ticket, cv = %self.cv.file_name, "matching candidate");
        let candidate = ctx.client().parse_cv(&self.cv).await?;
        let result = ctx.client().match_candidate(&summary, &candidate).await?;
        let outcome = ctx.store().write_score(result.match_score, ticket).await?;

        info!(%ticket, score = result.match_score, ?outcome, "candidate match stage finished");
        Ok(StageCompletion {
            stage: StageId::CandidateMatch,
            result: StageResult::Match(result),
            superseded: outcome == WriteOutcome::Superseded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Recommendation, format_percent};
    use crate::stages::InterviewStage;
    use crate::stages::test_support::context;
    use hirepipe_shared::UploadKind;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cv_file() -> UploadedFile {
        UploadedFile::from_bytes(UploadKind::Cv, "jane.pdf", b"%PDF-1.7".to_vec()).unwrap()
    }

    async fn seed_summary(ctx: &SessionContext, text: &str) {
        let ticket = ctx.store().issue_ticket().await.unwrap();
        ctx.store()
            .write_summary(&JobSummary::new(text), ticket)
            .await
            .unwrap();
    }

    async fn mount_backend(server: &MockServer, score: f64) {
        Mock::given(method("POST"))
            .and(path("/parse_cv/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "Jane Doe"})),
            )
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/match_cv_jd/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "match_score": score,
                "details": {"skills_match": 90, "keywords_found": 8, "total_keywords": 10}
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn stored_score_reaches_the_interview_stage() {
        let cases = [
            (76.4, "76%", Recommendation::Recommended),
            (82.0, "82%", Recommendation::HighlyRecommended),
        ];
        for (score, label, tier) in cases {
            let server = MockServer::start().await;
            mount_backend(&server, score).await;
            let ctx = context(&server.uri()).await;
            seed_summary(&ctx, "Senior Go backend role").await;

            let mut matching = CandidateMatchStage::new();
            matching.select_cv(cv_file());
            matching.execute(&ctx).await.unwrap();

            let mut interview = InterviewStage::new();
            interview.refresh(&ctx).await.unwrap();

            assert_eq!(interview.stored_score(), score);
            assert_eq!(format_percent(interview.stored_score()), label);
            assert_eq!(
                Recommendation::for_stored_score(interview.stored_score()),
                Some(tier)
            );
            assert!(!interview.review_warning());
        }
    }

    #[tokio::test]
    async fn refuses_without_stored_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let ctx = context(&server.uri()).await;
        let mut stage = CandidateMatchStage::new();
        stage.select_cv(cv_file());

        let err = stage.execute(&ctx).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(stage.status().error(), Some(NO_SUMMARY));
        assert!(stage.cv().is_some());
    }

    #[tokio::test]
    async fn refuses_without_cv() {
        let server = MockServer::start().await;
        let ctx = context(&server.uri()).await;
        seed_summary(&ctx, "Go role").await;

        let mut stage = CandidateMatchStage::new();
        let err = stage.execute(&ctx).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(stage.status().error(), Some(NO_CV));
    }

    #[tokio::test]
    async fn run_stores_the_score() {
        let server = MockServer::start().await;
        mount_backend(&server, 76.4).await;

        let ctx = context(&server.uri()).await;
        seed_summary(&ctx, "Go role").await;

        let mut stage = CandidateMatchStage::new();
        stage.select_cv(cv_file());
        let completion = stage.execute(&ctx).await.unwrap();

        assert!(!completion.superseded);
        assert_eq!(stage.status(), &StageStatus::Success);
        assert_eq!(stage.result().unwrap().match_score, 76.4);
        assert_eq!(ctx.store().read_score().await.unwrap(), 76.4);
    }

    #[tokio::test]
    async fn run_uses_the_latest_stored_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/parse_cv/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "cv"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/match_cv_jd/"))
            .and(body_partial_json(serde_json::json!({"jd_summary": {"text": "Rust role"}})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"match_score": 70})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server.uri()).await;
        seed_summary(&ctx, "Go role").await;
        seed_summary(&ctx, "Rust role").await;

        let mut stage = CandidateMatchStage::new();
        stage.refresh(&ctx).await.unwrap();
        assert_eq!(stage.stored_summary().text, "Rust role");

        stage.select_cv(cv_file());
        stage.execute(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn match_failure_keeps_the_summary() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/parse_cv/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ctx = context(&server.uri()).await;
        seed_summary(&ctx, "Go role").await;

        let mut stage = CandidateMatchStage::new();
        stage.select_cv(cv_file());
        assert!(stage.execute(&ctx).await.is_err());

        assert_eq!(stage.status().error(), Some(FALLBACK));
        assert_eq!(ctx.store().read_summary().await.unwrap().text, "Go role");
        assert_eq!(ctx.store().read_score().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn new_cv_clears_previous_result() {
        let server = MockServer::start().await;
        mount_backend(&server, 82.0).await;

        let ctx = context(&server.uri()).await;
        seed_summary(&ctx, "Go role").await;

        let mut stage = CandidateMatchStage::new();
        stage.select_cv(cv_file());
        stage.execute(&ctx).await.unwrap();
        assert!(stage.result().is_some());

        stage.select_cv(cv_file());
        assert!(stage.result().is_none());
        assert_eq!(stage.status(), &StageStatus::Idle);
        assert_eq!(stage.previews().live(), 1);
    }
}
