//! Request and response bodies as they cross the network boundary.

use hirepipe_shared::{CandidateParseResult, JobSummary};
use serde::{Deserialize, Serialize};

/// Multipart field carrying the job description.
pub(crate) const JD_FIELD: &str = "jd_file";

/// Multipart field carrying the CV.
pub(crate) const CV_FIELD: &str = "cv_file";

/// File name used when pasted JD text is sent as a file part.
pub(crate) const PASTED_JD_FILE_NAME: &str = "jd.txt";

/// `POST /summarize_jd/` response.
#[derive(Debug, Deserialize)]
pub(crate) struct SummarizeResponse {
    pub summary: String,
}

/// `POST /match_cv_jd/` request body.
#[derive(Debug, Serialize)]
pub(crate) struct MatchRequest<'a> {
    pub jd_summary: &'a JobSummary,
    pub candidate_data: &'a CandidateParseResult,
}

/// Pull the `detail` string out of an error body, if there is one.
///
/// Non-JSON bodies and non-string `detail` values (e.g. framework
/// validation arrays) yield `None` so callers fall back to a generic message.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")?
        .as_str()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
}
