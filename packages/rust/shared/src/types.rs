//! Core domain types for the recruitment pipeline.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HirePipeError, Result};

// ---------------------------------------------------------------------------
// SessionName
// ---------------------------------------------------------------------------

/// Name of a store session. Values written under one session are invisible
/// to every other session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionName(String);

impl SessionName {
    /// Use an explicit, operator-chosen session name.
    pub fn named(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HirePipeError::validation("session name must not be empty"));
        }
        Ok(Self(name))
    }

    /// Generate a fresh, time-sortable session name.
    pub fn generate() -> Self {
        Self(format!("session-{}", Uuid::now_v7()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// StageId
// ---------------------------------------------------------------------------

/// The three steps of the workflow, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    JobSummary,
    CandidateMatch,
    Interview,
}

impl StageId {
    /// All stages, in pipeline order.
    pub const ALL: [StageId; 3] = [Self::JobSummary, Self::CandidateMatch, Self::Interview];

    /// Position of the stage in the pipeline (0..=2).
    pub fn index(self) -> usize {
        match self {
            Self::JobSummary => 0,
            Self::CandidateMatch => 1,
            Self::Interview => 2,
        }
    }

    /// Stage at `index`, if any.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JobSummary => write!(f, "Job Summary"),
            Self::CandidateMatch => write!(f, "Candidate Match"),
            Self::Interview => write!(f, "Interview"),
        }
    }
}

// ---------------------------------------------------------------------------
// JobSummary / CandidateParseResult
// ---------------------------------------------------------------------------

/// Summarized job description. `{}` decodes to the empty summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(default)]
    pub text: String,
}

impl JobSummary {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// True when there is no usable summary text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Opaque parsed-candidate payload, passed through to the match call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateParseResult(pub serde_json::Value);

impl CandidateParseResult {
    /// Wrap a parsed payload; JSON `null` is not a candidate.
    pub fn new(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Err(HirePipeError::invalid_response("CV parser returned null"));
        }
        Ok(Self(value))
    }
}

// ---------------------------------------------------------------------------
// MatchResult
// ---------------------------------------------------------------------------

/// Score of a candidate against a job summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Overall compatibility, 0–100.
    pub match_score: f64,
    /// Breakdown; absent in the response means all-zero details.
    #[serde(default)]
    pub details: MatchDetails,
}

/// Per-dimension breakdown of a [`MatchResult`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchDetails {
    #[serde(default)]
    pub skills_match: f64,
    #[serde(default)]
    pub experience_match: f64,
    #[serde(default)]
    pub education_match: f64,
    #[serde(default)]
    pub keywords_found: u32,
    #[serde(default)]
    pub total_keywords: u32,
    #[serde(default)]
    pub skills_breakdown: Vec<SkillEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
}

/// One skill of the breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub skill: String,
    #[serde(default)]
    pub match_percentage: f64,
    #[serde(default)]
    pub found: bool,
}

impl MatchResult {
    /// Enforce the schema's numeric invariants.
    ///
    /// The overall score must be a finite value in `[0, 100]`. Detail
    /// percentages are clamped into range and `keywords_found` is capped at
    /// `total_keywords`.
    pub fn validated(mut self) -> Result<Self> {
        if !self.match_score.is_finite() || !(0.0..=100.0).contains(&self.match_score) {
            return Err(HirePipeError::invalid_response(format!(
                "match_score {} is outside 0-100",
                self.match_score
            )));
        }

        let d = &mut self.details;
        d.skills_match = clamp_percent("skills_match", d.skills_match);
        d.experience_match = clamp_percent("experience_match", d.experience_match);
        d.education_match = clamp_percent("education_match", d.education_match);
        for entry in &mut d.skills_breakdown {
            entry.match_percentage = clamp_percent(&entry.skill, entry.match_percentage);
        }
        if d.keywords_found > d.total_keywords {
            tracing::warn!(
                found = d.keywords_found,
                total = d.total_keywords,
                "keywords_found exceeds total_keywords, capping"
            );
            d.keywords_found = d.total_keywords;
        }

        Ok(self)
    }
}

fn clamp_percent(field: &str, value: f64) -> f64 {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        return value;
    }
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) };
    tracing::warn!(field, value, clamped, "percentage out of range, clamping");
    clamped
}

// ---------------------------------------------------------------------------
// InvitationReceipt
// ---------------------------------------------------------------------------

/// Backend acknowledgement of an interview invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationReceipt {
    #[serde(default = "default_receipt_message")]
    pub message: String,
}

fn default_receipt_message() -> String {
    "Sent".into()
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

/// What an upload is for; each purpose accepts its own set of formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    JobDescription,
    Cv,
}

impl UploadKind {
    fn accepts(self, extension: &str) -> bool {
        match self {
            Self::JobDescription => matches!(extension, "pdf" | "txt" | "doc" | "docx" | "md"),
            Self::Cv => matches!(extension, "pdf" | "doc" | "docx" | "txt"),
        }
    }
}

/// A file selected by the operator, held in memory until it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Build an upload from in-memory content, checking the extension.
    pub fn from_bytes(
        kind: UploadKind,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        let file_name = file_name.into();
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if !kind.accepts(&extension) {
            return Err(HirePipeError::validation(format!(
                "Unsupported file format: {file_name}"
            )));
        }
        if bytes.is_empty() {
            return Err(HirePipeError::validation(format!("{file_name} is empty")));
        }

        Ok(Self {
            content_type: content_type_for(&extension),
            file_name,
            bytes,
        })
    }

    /// Read an upload from disk.
    pub fn read(kind: UploadKind, path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| HirePipeError::io(path, e))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                HirePipeError::validation(format!("not a file path: {}", path.display()))
            })?
            .to_string();
        Self::from_bytes(kind, file_name, bytes)
    }

    /// Whether the content is plain text that can be previewed inline.
    pub fn is_text(&self) -> bool {
        self.content_type.starts_with("text/")
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "md" => "text/markdown",
        _ => "text/plain",
    }
}

/// Job description input: exactly one of an uploaded file or pasted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JdInput {
    File(UploadedFile),
    Text(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_empty_summary() {
        let summary: JobSummary = serde_json::from_str("{}").expect("decode");
        assert!(summary.is_empty());
        assert!(JobSummary::new("   ").is_empty());
        assert!(!JobSummary::new("Go backend role").is_empty());
    }

    #[test]
    fn stage_index_roundtrip() {
        for stage in StageId::ALL {
            assert_eq!(StageId::from_index(stage.index()), Some(stage));
        }
        assert_eq!(StageId::from_index(3), None);
    }

    #[test]
    fn match_result_without_details() {
        let result: MatchResult = serde_json::from_str(r#"{"match_score": 64}"#).expect("decode");
        assert_eq!(result.match_score, 64.0);
        assert_eq!(result.details, MatchDetails::default());
        assert!(result.details.analysis.is_none());
    }

    #[test]
    fn match_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/match_response.fixture.json")
            .expect("read fixture");
        let parsed: MatchResult = serde_json::from_str(&fixture).expect("deserialize fixture");
        let parsed = parsed.validated().expect("valid fixture");
        assert_eq!(parsed.match_score, 82.0);
        assert_eq!(parsed.details.keywords_found, 8);
        assert_eq!(parsed.details.total_keywords, 10);
        assert_eq!(parsed.details.skills_breakdown[0].skill, "Go");
        assert!(parsed.details.skills_breakdown[0].found);
    }

    #[test]
    fn validated_rejects_out_of_range_score() {
        let result = MatchResult {
            match_score: 140.0,
            details: MatchDetails::default(),
        };
        assert!(result.validated().is_err());

        let result = MatchResult {
            match_score: f64::NAN,
            details: MatchDetails::default(),
        };
        assert!(result.validated().is_err());
    }

    #[test]
    fn validated_accepts_score_bounds() {
        for score in [0.0, 100.0] {
            let result = MatchResult {
                match_score: score,
                details: MatchDetails::default(),
            }
            .validated()
            .unwrap();
            assert_eq!(result.match_score, score);
            assert_eq!(result.details.total_keywords, 0);
        }
    }

    #[test]
    fn validated_clamps_details() {
        let result = MatchResult {
            match_score: 100.0,
            details: MatchDetails {
                skills_match: 120.0,
                experience_match: -3.0,
                keywords_found: 12,
                total_keywords: 10,
                skills_breakdown: vec![SkillEntry {
                    skill: "Rust".into(),
                    match_percentage: f64::NAN,
                    found: false,
                }],
                ..MatchDetails::default()
            },
        }
        .validated()
        .expect("score in range");

        assert_eq!(result.details.skills_match, 100.0);
        assert_eq!(result.details.experience_match, 0.0);
        assert_eq!(result.details.keywords_found, 10);
        assert_eq!(result.details.skills_breakdown[0].match_percentage, 0.0);
    }

    #[test]
    fn receipt_defaults_message() {
        let receipt: InvitationReceipt = serde_json::from_str("{}").expect("decode");
        assert_eq!(receipt.message, "Sent");
    }

    #[test]
    fn candidate_rejects_null() {
        assert!(CandidateParseResult::new(serde_json::Value::Null).is_err());
        assert!(CandidateParseResult::new(serde_json::json!({"text": "cv"})).is_ok());
    }

    #[test]
    fn upload_kind_filters_extensions() {
        let jd = UploadedFile::from_bytes(UploadKind::JobDescription, "role.MD", b"# Role".to_vec())
            .expect("markdown JD");
        assert_eq!(jd.content_type, "text/markdown");
        assert!(jd.is_text());

        let cv = UploadedFile::from_bytes(UploadKind::Cv, "cv.pdf", b"%PDF-1.7".to_vec())
            .expect("pdf CV");
        assert_eq!(cv.content_type, "application/pdf");
        assert!(!cv.is_text());

        let err = UploadedFile::from_bytes(UploadKind::Cv, "cv.md", b"text".to_vec()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));

        let err = UploadedFile::from_bytes(UploadKind::Cv, "cv.pdf", Vec::new()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn session_names() {
        assert!(SessionName::named("  ").is_err());
        assert_eq!(SessionName::named("screening").unwrap().as_str(), "screening");
        let a = SessionName::generate();
        let b = SessionName::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("session-"));
    }
}
