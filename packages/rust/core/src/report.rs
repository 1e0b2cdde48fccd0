//! Display rules for match results.
//!
//! Everything a renderer needs to show a [`MatchResult`] or a stored score:
//! rounded labels, the recommendation tier, the verdict sentence and the
//! low-score warning. Renderers (CLI, TUI) only lay these out.

use std::fmt;

use hirepipe_shared::MatchResult;
use serde::Serialize;

/// Scores below this (and above zero) get the review warning.
pub const REVIEW_THRESHOLD: f64 = 60.0;

/// Scores at or above this are highly recommended.
pub const STRONG_THRESHOLD: f64 = 80.0;

pub const REVIEW_WARNING: &str = "Note: This candidate has a match score below 60%. \
Consider reviewing their qualifications carefully before scheduling an interview.";

pub const EMPTY_BREAKDOWN_NOTICE: &str = "No detailed skill breakdown available";

/// Round half-up to a whole percentage: `76.5` → `77%`, `76.4` → `76%`.
pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return "0%".to_string();
    }
    format!("{}%", (value + 0.5).floor() as i64)
}

/// Share of keywords found, in `[0, 1]`. Zero keywords yields `0.0`.
pub fn keyword_ratio(found: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(found.min(total))) / f64::from(total)
}

/// Whether a non-zero score is low enough to warrant a second look.
pub fn needs_review_warning(score: f64) -> bool {
    score > 0.0 && score < REVIEW_THRESHOLD
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// Severity a renderer should use for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Warning,
    Error,
}

/// Recommendation tier of a match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    HighlyRecommended,
    Recommended,
    ConsiderCarefully,
}

impl Recommendation {
    pub fn from_score(score: f64) -> Self {
        if score >= STRONG_THRESHOLD {
            Self::HighlyRecommended
        } else if score >= REVIEW_THRESHOLD {
            Self::Recommended
        } else {
            Self::ConsiderCarefully
        }
    }

    /// Tier for a stored score; zero means nothing has been scored yet.
    pub fn for_stored_score(score: f64) -> Option<Self> {
        (score > 0.0).then(|| Self::from_score(score))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::HighlyRecommended => "Highly Recommended",
            Self::Recommended => "Recommended",
            Self::ConsiderCarefully => "Consider Carefully",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            Self::HighlyRecommended => Tone::Success,
            Self::Recommended => Tone::Warning,
            Self::ConsiderCarefully => Tone::Error,
        }
    }

    /// One-sentence verdict shown under the score.
    pub fn verdict(self) -> &'static str {
        match self {
            Self::HighlyRecommended => {
                "Excellent match! This candidate strongly aligns with the job requirements."
            }
            Self::Recommended => "Good match. This candidate meets most of the job requirements.",
            Self::ConsiderCarefully => {
                "Moderate match. Consider reviewing specific requirements with this candidate."
            }
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// MatchReport
// ---------------------------------------------------------------------------

/// One row of the skill breakdown, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillRow {
    pub skill: String,
    pub percent: f64,
    pub label: String,
    pub found: bool,
}

/// A [`MatchResult`] turned into display values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub score: f64,
    pub score_label: String,
    pub recommendation: Recommendation,
    pub verdict: &'static str,
    pub skills_label: String,
    pub experience_label: String,
    pub education_label: String,
    pub keywords_label: String,
    pub keyword_ratio: f64,
    pub skills: Vec<SkillRow>,
    /// Set when the backend sent no per-skill breakdown.
    pub breakdown_notice: Option<&'static str>,
    pub analysis: Option<String>,
}

impl From<&MatchResult> for MatchReport {
    fn from(result: &MatchResult) -> Self {
        let d = &result.details;
        let recommendation = Recommendation::from_score(result.match_score);

        let skills: Vec<SkillRow> = d
            .skills_breakdown
            .iter()
            .map(|entry| SkillRow {
                skill: entry.skill.clone(),
                percent: entry.match_percentage,
                label: format_percent(entry.match_percentage),
                found: entry.found,
            })
            .collect();

        Self {
            score: result.match_score,
            score_label: format_percent(result.match_score),
            recommendation,
            verdict: recommendation.verdict(),
            skills_label: format_percent(d.skills_match),
            experience_label: format_percent(d.experience_match),
            education_label: format_percent(d.education_match),
            keywords_label: format!("{}/{}", d.keywords_found, d.total_keywords),
            keyword_ratio: keyword_ratio(d.keywords_found, d.total_keywords),
            breakdown_notice: skills.is_empty().then_some(EMPTY_BREAKDOWN_NOTICE),
            skills,
            analysis: d
                .analysis
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from),
        }
    }
}
