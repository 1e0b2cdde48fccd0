//! Pipeline controller: JD summary → candidate match → interview.
//!
//! The stage sequence is an explicit transition table ([`transition`]) over
//! [`PipelineEvent`]s. [`PipelineController`] holds the session's in-memory
//! pipeline state and [`Pipeline`] pairs it with the three stages so front
//! ends only dispatch jobs and feed completions back.

use std::fmt;

use hirepipe_shared::{HirePipeError, JdInput, Result, StageId, UploadedFile};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::report::{Recommendation, format_percent};
use crate::session::SessionContext;
use crate::stages::{
    CandidateMatchStage, InterviewStage, JobSummaryStage, StageCompletion, StageJob, StageResult,
};

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Something that can move the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A stage run finished and its result was stored.
    Completed(StageId),
    /// The operator asked to move on from the match results.
    Continue,
    /// The operator picked a stage directly.
    Navigate(StageId),
}

/// Per-stage completion flags, indexed by [`StageId::index`].
pub type CompletionFlags = [bool; 3];

/// Next active stage for `event`.
///
/// Only a completed job summary advances on its own, and only when the
/// operator is still looking at it. Matching waits for an explicit
/// continue. Direct navigation is always allowed.
pub fn transition(active: StageId, event: PipelineEvent, completed: &CompletionFlags) -> StageId {
    match event {
        PipelineEvent::Completed(StageId::JobSummary) if active == StageId::JobSummary => {
            StageId::CandidateMatch
        }
        PipelineEvent::Completed(_) => active,
        PipelineEvent::Continue
            if active == StageId::CandidateMatch
                && completed[StageId::CandidateMatch.index()] =>
        {
            StageId::Interview
        }
        PipelineEvent::Continue => active,
        PipelineEvent::Navigate(target) => target,
    }
}

/// A move of the active stage (possibly to itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StageId,
    pub to: StageId,
}

impl Transition {
    pub fn changed(self) -> bool {
        self.from != self.to
    }

    /// Entering match or interview must re-read the stage store.
    pub fn requires_refresh(self) -> bool {
        self.changed() && matches!(self.to, StageId::CandidateMatch | StageId::Interview)
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// In-memory pipeline state. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub active: StageId,
    pub completed: CompletionFlags,
    pub results: [Option<StageResult>; 3],
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            active: StageId::JobSummary,
            completed: [false; 3],
            results: [None, None, None],
        }
    }
}

/// Tracks which stage is active, which are complete, and their results.
#[derive(Debug, Default)]
pub struct PipelineController {
    state: PipelineState,
}

impl PipelineController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn active(&self) -> StageId {
        self.state.active
    }

    pub fn is_complete(&self, stage: StageId) -> bool {
        self.state.completed[stage.index()]
    }

    pub fn result(&self, stage: StageId) -> Option<&StageResult> {
        self.state.results[stage.index()].as_ref()
    }

    /// Apply an event through the transition table.
    pub fn apply(&mut self, event: PipelineEvent) -> Transition {
        let from = self.state.active;
        let to = transition(from, event, &self.state.completed);
        self.state.active = to;
        if from != to {
            debug!(%from, %to, ?event, "active stage changed");
        }
        Transition { from, to }
    }

    pub fn navigate(&mut self, stage: StageId) -> Transition {
        self.apply(PipelineEvent::Navigate(stage))
    }

    pub fn proceed(&mut self) -> Transition {
        self.apply(PipelineEvent::Continue)
    }

    /// Record a finished run.
    ///
    /// The result replaces any earlier one for that stage. A superseded run
    /// is kept for display but does not complete the stage or advance.
    pub fn complete(&mut self, completion: StageCompletion) -> Transition {
        let stage = completion.stage;
        self.state.results[stage.index()] = Some(completion.result);

        if completion.superseded {
            info!(%stage, "stage result superseded by a newer run");
            let active = self.state.active;
            return Transition {
                from: active,
                to: active,
            };
        }

        self.state.completed[stage.index()] = true;
        self.apply(PipelineEvent::Completed(stage))
    }

    /// One line per stage for the summary view.
    pub fn summary(&self) -> PipelineSummary {
        let stages = StageId::ALL
            .iter()
            .map(|&stage| StageLine {
                stage,
                complete: self.is_complete(stage),
                detail: self
                    .result(stage)
                    .map(describe)
                    .unwrap_or_else(|| "not run".to_string()),
            })
            .collect();

        PipelineSummary {
            active: self.state.active,
            stages,
        }
    }
}

fn describe(result: &StageResult) -> String {
    const SUMMARY_CHARS: usize = 72;

    match result {
        StageResult::Summary(summary) => {
            let first_line = summary.text.lines().next().unwrap_or_default().trim();
            let mut text: String = first_line.chars().take(SUMMARY_CHARS).collect();
            if first_line.chars().count() > SUMMARY_CHARS || summary.text.lines().count() > 1 {
                text.push('…');
            }
            text
        }
        StageResult::Match(result) => format!(
            "{} ({})",
            format_percent(result.match_score),
            Recommendation::from_score(result.match_score)
        ),
        StageResult::Invitation(sent) => sent.receipt.message.clone(),
    }
}

/// Aggregate status of all three stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub active: StageId,
    pub stages: Vec<StageLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageLine {
    pub stage: StageId,
    pub complete: bool,
    pub detail: String,
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.stages {
            let mark = if line.complete { "✓" } else { " " };
            let pointer = if line.stage == self.active { ">" } else { " " };
            writeln!(f, "{pointer} [{mark}] {:<16} {}", line.stage.to_string(), line.detail)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pipeline (controller + stages)
// ---------------------------------------------------------------------------

/// Progress callback for scripted pipeline runs.
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage's remote calls start.
    fn stage_started(&self, stage: StageId);
    /// Called after a stage's result has been recorded.
    fn stage_finished(&self, completion: &StageCompletion);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: StageId) {}
    fn stage_finished(&self, _completion: &StageCompletion) {}
}

/// The controller together with the three stage components.
#[derive(Debug, Default)]
pub struct Pipeline {
    pub controller: PipelineController,
    pub job_summary: JobSummaryStage,
    pub candidate_match: CandidateMatchStage,
    pub interview: InterviewStage,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run of the active stage.
    pub fn begin_active(&mut self) -> Result<StageJob> {
        match self.controller.active() {
            StageId::JobSummary => self.job_summary.begin().map(StageJob::Summarize),
            StageId::CandidateMatch => self.candidate_match.begin().map(StageJob::Match),
            StageId::Interview => self.interview.begin().map(StageJob::Invite),
        }
    }

    /// Hand a finished run back to its stage, then to the controller.
    pub fn finish(
        &mut self,
        stage: StageId,
        outcome: Result<StageCompletion>,
    ) -> Result<(StageCompletion, Transition)> {
        match stage {
            StageId::JobSummary => self.job_summary.finish(&outcome),
            StageId::CandidateMatch => self.candidate_match.finish(&outcome),
            StageId::Interview => self.interview.finish(&outcome),
        }

        let completion = outcome?;
        let transition = self.controller.complete(completion.clone());
        Ok((completion, transition))
    }

    /// Re-read the store for `stage` if it depends on it.
    pub async fn refresh(&mut self, stage: StageId, ctx: &SessionContext) -> Result<()> {
        match stage {
            StageId::JobSummary => Ok(()),
            StageId::CandidateMatch => self.candidate_match.refresh(ctx).await,
            StageId::Interview => self.interview.refresh(ctx).await,
        }
    }

    /// Apply the side effects of a transition.
    pub async fn enter(&mut self, transition: Transition, ctx: &SessionContext) -> Result<()> {
        if transition.requires_refresh() {
            self.refresh(transition.to, ctx).await?;
        }
        Ok(())
    }

    /// Bring the screen up to date after a run of any stage finished.
    ///
    /// Follows the transition like [`Pipeline::enter`]. When the run stored a
    /// value while the operator sits on a later stage, that stage re-reads
    /// the store instead of showing the value it read on entry.
    pub async fn settle(
        &mut self,
        completion: &StageCompletion,
        transition: Transition,
        ctx: &SessionContext,
    ) -> Result<()> {
        if transition.requires_refresh() {
            return self.refresh(transition.to, ctx).await;
        }
        let active = self.controller.active();
        if !completion.superseded && completion.stage != active {
            self.refresh(active, ctx).await?;
        }
        Ok(())
    }

    /// Run the active stage to completion and follow the resulting transition.
    pub async fn run_active(
        &mut self,
        ctx: &SessionContext,
        progress: &dyn ProgressReporter,
    ) -> Result<Transition> {
        let job = self.begin_active()?;
        let stage = job.stage();
        progress.stage_started(stage);

        let outcome = job.run(ctx).await;
        let (completion, transition) = self.finish(stage, outcome)?;
        progress.stage_finished(&completion);

        self.settle(&completion, transition, ctx).await?;
        Ok(transition)
    }
}

/// Inputs for an end-to-end run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub jd: JdInput,
    pub cv: UploadedFile,
    /// Candidate name and email; the interview stage is skipped without them.
    pub invite: Option<(String, String)>,
}

/// Drive all stages in order: summarize, match, then (optionally) invite.
#[instrument(skip_all, fields(session = %ctx.session()))]
pub async fn run_pipeline(
    ctx: &SessionContext,
    request: RunRequest,
    progress: &dyn ProgressReporter,
) -> Result<PipelineSummary> {
    let mut pipeline = Pipeline::new();
    info!("starting pipeline run");

    match request.jd {
        JdInput::File(file) => pipeline.job_summary.select_file(file),
        JdInput::Text(text) => pipeline.job_summary.set_text(text),
    }
    pipeline.run_active(ctx, progress).await?;

    if pipeline.controller.active() != StageId::CandidateMatch {
        return Err(HirePipeError::validation(
            "Job summary was superseded by a newer run; not matching against it",
        ));
    }

    pipeline.candidate_match.select_cv(request.cv);
    pipeline.run_active(ctx, progress).await?;

    if let Some((name, email)) = request.invite {
        let transition = pipeline.controller.proceed();
        if transition.to != StageId::Interview {
            return Err(HirePipeError::validation(
                "Candidate match was superseded by a newer run; not sending an invitation",
            ));
        }
        pipeline.enter(transition, ctx).await?;
        pipeline.interview.set_name(name);
        pipeline.interview.set_email(email);
        pipeline.run_active(ctx, progress).await?;
    }

    let summary = pipeline.controller.summary();
    info!(active = %summary.active, "pipeline run finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::stages::{InterviewOutcome, Stage};
    use crate::stages::test_support::context;
    use hirepipe_shared::{InvitationReceipt, JobSummary, MatchDetails, MatchResult, UploadKind};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NONE_DONE: CompletionFlags = [false; 3];

    fn summary_completion(text: &str, superseded: bool) -> StageCompletion {
        StageCompletion {
            stage: StageId::JobSummary,
            result: StageResult::Summary(JobSummary::new(text)),
            superseded,
        }
    }

    fn match_completion(score: f64) -> StageCompletion {
        StageCompletion {
            stage: StageId::CandidateMatch,
            result: StageResult::Match(MatchResult {
                match_score: score,
                details: MatchDetails::default(),
            }),
            superseded: false,
        }
    }

    #[test]
    fn summary_completion_auto_advances() {
        assert_eq!(
            transition(StageId::JobSummary, PipelineEvent::Completed(StageId::JobSummary), &NONE_DONE),
            StageId::CandidateMatch
        );
    }

    #[test]
    fn late_summary_completion_does_not_move_the_operator() {
        assert_eq!(
            transition(StageId::Interview, PipelineEvent::Completed(StageId::JobSummary), &NONE_DONE),
            StageId::Interview
        );
    }

    #[test]
    fn match_completion_waits_for_continue() {
        let done = [true, true, false];
        assert_eq!(
            transition(
                StageId::CandidateMatch,
                PipelineEvent::Completed(StageId::CandidateMatch),
                &done
            ),
            StageId::CandidateMatch
        );
        assert_eq!(
            transition(StageId::CandidateMatch, PipelineEvent::Continue, &done),
            StageId::Interview
        );
    }

    #[test]
    fn continue_requires_a_completed_match() {
        assert_eq!(
            transition(StageId::CandidateMatch, PipelineEvent::Continue, &NONE_DONE),
            StageId::CandidateMatch
        );
        assert_eq!(
            transition(StageId::JobSummary, PipelineEvent::Continue, &[true, true, true]),
            StageId::JobSummary
        );
    }

    #[test]
    fn navigation_is_always_allowed() {
        for from in StageId::ALL {
            for to in StageId::ALL {
                assert_eq!(transition(from, PipelineEvent::Navigate(to), &NONE_DONE), to);
            }
        }
    }

    #[test]
    fn refresh_only_on_entry_to_dependent_stages() {
        let t = Transition {
            from: StageId::JobSummary,
            to: StageId::CandidateMatch,
        };
        assert!(t.requires_refresh());

        let t = Transition {
            from: StageId::Interview,
            to: StageId::JobSummary,
        };
        assert!(!t.requires_refresh());

        let t = Transition {
            from: StageId::Interview,
            to: StageId::Interview,
        };
        assert!(!t.requires_refresh());
    }

    #[test]
    fn controller_records_and_overwrites_results() {
        let mut controller = PipelineController::new();

        let t = controller.complete(summary_completion("first", false));
        assert_eq!(t.to, StageId::CandidateMatch);
        assert!(controller.is_complete(StageId::JobSummary));

        controller.navigate(StageId::JobSummary);
        controller.complete(summary_completion("second", false));
        assert_eq!(
            controller.result(StageId::JobSummary),
            Some(&StageResult::Summary(JobSummary::new("second")))
        );
    }

    #[test]
    fn superseded_completion_is_recorded_but_not_completed() {
        let mut controller = PipelineController::new();
        let t = controller.complete(summary_completion("stale", true));

        assert!(!t.changed());
        assert!(!controller.is_complete(StageId::JobSummary));
        assert!(controller.result(StageId::JobSummary).is_some());
    }

    #[test]
    fn summary_lists_every_stage() {
        let mut controller = PipelineController::new();
        controller.complete(summary_completion("Senior Go backend role\nRemote", false));
        controller.complete(match_completion(82.0));
        controller.proceed();
        controller.complete(StageCompletion {
            stage: StageId::Interview,
            result: StageResult::Invitation(InterviewOutcome {
                receipt: InvitationReceipt {
                    message: "Email sent".into(),
                },
                score: 82.0,
                review_warning: false,
            }),
            superseded: false,
        });

        let summary = controller.summary();
        assert_eq!(summary.active, StageId::Interview);
        assert!(summary.stages.iter().all(|l| l.complete));
        assert_eq!(summary.stages[0].detail, "Senior Go backend role…");
        assert_eq!(summary.stages[1].detail, "82% (Highly Recommended)");
        assert_eq!(summary.stages[2].detail, "Email sent");

        let rendered = summary.to_string();
        assert!(rendered.contains("> [✓] Interview"));
    }

    #[test]
    fn fresh_summary_has_nothing_run() {
        let summary = PipelineController::new().summary();
        assert_eq!(summary.active, StageId::JobSummary);
        assert!(summary.stages.iter().all(|l| !l.complete && l.detail == "not run"));
    }

    #[tokio::test]
    async fn end_to_end_run() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize_jd/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "summary": "Senior Go backend role"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/parse_cv/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": "Jane"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/match_cv_jd/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"match_score": 82})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/send_interview_email/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "Email sent"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ctx = context(&server.uri()).await;
        let request = RunRequest {
            jd: JdInput::Text("Senior backend engineer, 5+ years Go".into()),
            cv: UploadedFile::from_bytes(UploadKind::Cv, "jane.pdf", b"%PDF".to_vec()).unwrap(),
            invite: Some(("Jane Doe".into(), "jane@example.com".into())),
        };

        let summary = run_pipeline(&ctx, request, &SilentProgress).await.unwrap();
        assert_eq!(summary.active, StageId::Interview);
        assert!(summary.stages.iter().all(|l| l.complete));
        assert_eq!(ctx.store().read_score().await.unwrap(), 82.0);
    }

    #[tokio::test]
    async fn rerunning_the_summary_feeds_the_next_match() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize_jd/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"summary": "new"})),
            )
            .mount(&server)
            .await;

        let ctx = context(&server.uri()).await;
        let mut pipeline = Pipeline::new();
        pipeline.job_summary.set_text("jd");
        let t = pipeline.run_active(&ctx, &SilentProgress).await.unwrap();
        assert_eq!(t.to, StageId::CandidateMatch);
        assert_eq!(pipeline.candidate_match.stored_summary().text, "new");

        let t = pipeline.controller.navigate(StageId::JobSummary);
        pipeline.enter(t, &ctx).await.unwrap();
        pipeline.job_summary.set_text("other jd");
        pipeline.run_active(&ctx, &SilentProgress).await.unwrap();
        assert_eq!(pipeline.controller.active(), StageId::CandidateMatch);
    }

    #[tokio::test]
    async fn failed_stage_leaves_pipeline_in_place() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let ctx = context(&server.uri()).await;
        let mut pipeline = Pipeline::new();
        pipeline.job_summary.set_text("jd");

        assert!(pipeline.run_active(&ctx, &SilentProgress).await.is_err());
        assert_eq!(pipeline.controller.active(), StageId::JobSummary);
        assert!(!pipeline.controller.is_complete(StageId::JobSummary));
        assert!(pipeline.job_summary.status().error().is_some());
    }

    #[tokio::test]
    async fn summary_landing_behind_the_operator_refreshes_their_stage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize_jd/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"summary": "fresh"})),
            )
            .mount(&server)
            .await;

        let ctx = context(&server.uri()).await;
        let mut pipeline = Pipeline::new();

        pipeline.job_summary.set_text("jd");
        let job = pipeline.begin_active().unwrap();

        // Operator moves on before the summary arrives.
        let t = pipeline.controller.navigate(StageId::CandidateMatch);
        pipeline.enter(t, &ctx).await.unwrap();
        assert!(pipeline.candidate_match.stored_summary().is_empty());

        let outcome = job.run(&ctx).await;
        let (completion, transition) = pipeline.finish(StageId::JobSummary, outcome).unwrap();
        assert!(!transition.changed());

        pipeline.settle(&completion, transition, &ctx).await.unwrap();
        assert_eq!(pipeline.controller.active(), StageId::CandidateMatch);
        assert_eq!(pipeline.candidate_match.stored_summary().text, "fresh");
    }

    #[tokio::test]
    async fn late_write_from_an_older_run_is_superseded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/summarize_jd/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"summary": "old"}))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;

        let ctx = context(&server.uri()).await;
        let mut pipeline = Pipeline::new();

        pipeline.job_summary.set_text("first jd");
        let older = pipeline.begin_active().unwrap();
        let task_ctx = Arc::clone(&ctx);
        let in_flight = tokio::spawn(async move { older.run(&task_ctx).await });

        // A newer run stores its summary while the older call is still out.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let newer_ticket = ctx.store().issue_ticket().await.unwrap();
        ctx.store()
            .write_summary(&JobSummary::new("newer"), newer_ticket)
            .await
            .unwrap();

        let outcome = in_flight.await.unwrap();
        let (completion, transition) = pipeline.finish(StageId::JobSummary, outcome).unwrap();

        assert!(completion.superseded);
        assert!(!transition.changed());
        assert_eq!(ctx.store().read_summary().await.unwrap().text, "newer");
    }
}
