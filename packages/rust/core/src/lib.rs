//! Pipeline orchestration for hirepipe.
//!
//! This crate ties the stage store and the backend client together into the
//! three-stage workflow: summarize a job description, match a candidate, and
//! send an interview invitation.

pub mod pipeline;
pub mod preview;
pub mod report;
pub mod session;
pub mod stages;

pub use pipeline::{
    Pipeline, PipelineController, PipelineEvent, PipelineSummary, ProgressReporter, RunRequest,
    SilentProgress, Transition, run_pipeline, transition,
};
pub use session::SessionContext;
pub use stages::{Stage, StageCompletion, StageJob, StageResult, StageStatus};
