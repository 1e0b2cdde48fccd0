//! Shared types, error model, and configuration for hirepipe.
//!
//! This crate is the foundation depended on by all other hirepipe crates.
//! It provides:
//! - [`HirePipeError`], the unified error type
//! - Domain types ([`JobSummary`], [`MatchResult`], [`StageId`], [`UploadedFile`])
//! - Configuration ([`AppConfig`], [`ApiSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, ApiSettings, AppConfig, DEFAULT_API_BASE_URL, SessionConfig, StorageConfig,
    config_dir, config_file_path, expand_home, init_config, load_config, load_config_from,
};
pub use error::{HirePipeError, Result};
pub use types::{
    CandidateParseResult, InvitationReceipt, JdInput, JobSummary, MatchDetails, MatchResult,
    SessionName, SkillEntry, StageId, UploadKind, UploadedFile,
};
