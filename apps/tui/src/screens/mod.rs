//! TUI screen definitions.
//!
//! One screen per pipeline stage. Screens hold only UI state (focus, edit
//! mode, path buffers); stage inputs and results live in the stage
//! components the screens are handed.

mod candidate_match;
mod interview;
mod job_summary;

use crossterm::event::{KeyCode, KeyModifiers};
use hirepipe_core::Pipeline;
use hirepipe_shared::StageId;
use ratatui::prelude::*;

/// UI state for all three screens.
pub(crate) struct Screens {
    job_summary: job_summary::JobSummaryScreen,
    candidate_match: candidate_match::CandidateMatchScreen,
    interview: interview::InterviewScreen,
}

impl Screens {
    pub(crate) fn new() -> Self {
        Self {
            job_summary: job_summary::JobSummaryScreen::new(),
            candidate_match: candidate_match::CandidateMatchScreen::new(),
            interview: interview::InterviewScreen::new(),
        }
    }

    /// Whether the screen for `stage` has an active text input field.
    pub(crate) fn is_editing(&self, stage: StageId) -> bool {
        match stage {
            StageId::JobSummary => self.job_summary.is_editing(),
            StageId::CandidateMatch => self.candidate_match.is_editing(),
            StageId::Interview => self.interview.is_editing(),
        }
    }

    pub(crate) fn draw(&self, f: &mut Frame, area: Rect, pipeline: &Pipeline) {
        match pipeline.controller.active() {
            StageId::JobSummary => self.job_summary.draw(f, area, &pipeline.job_summary),
            StageId::CandidateMatch => {
                self.candidate_match
                    .draw(f, area, &pipeline.candidate_match)
            }
            StageId::Interview => self.interview.draw(f, area, &pipeline.interview),
        }
    }

    pub(crate) fn handle_key(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        pipeline: &mut Pipeline,
    ) -> Option<String> {
        match pipeline.controller.active() {
            StageId::JobSummary => {
                self.job_summary
                    .handle_key(code, modifiers, &mut pipeline.job_summary)
            }
            StageId::CandidateMatch => {
                self.candidate_match
                    .handle_key(code, modifiers, &mut pipeline.candidate_match)
            }
            StageId::Interview => {
                self.interview
                    .handle_key(code, modifiers, &mut pipeline.interview)
            }
        }
    }
}
