//! Typed client for the recruitment backend.
//!
//! Four single round-trip operations against one configurable base URL:
//! summarize a job description, parse a CV, match the two, and send an
//! interview invitation. There is no retry; a failed call surfaces as one
//! [`HirePipeError`] and the caller decides what the operator sees.

mod wire;

use hirepipe_shared::{
    ApiSettings, CandidateParseResult, HirePipeError, InvitationReceipt, JdInput, JobSummary,
    MatchResult, Result, UploadedFile,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};
use url::Url;

use wire::{CV_FIELD, JD_FIELD, MatchRequest, PASTED_JD_FILE_NAME, SummarizeResponse};

const SUMMARIZE_ENDPOINT: &str = "/summarize_jd/";
const PARSE_CV_ENDPOINT: &str = "/parse_cv/";
const MATCH_ENDPOINT: &str = "/match_cv_jd/";
const INVITATION_ENDPOINT: &str = "/send_interview_email/";

/// User-Agent string for backend requests.
const USER_AGENT: &str = concat!("hirepipe/", env!("CARGO_PKG_VERSION"));

/// HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    /// Build a client from resolved settings.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| HirePipeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Summarize a job description sent as a file or as pasted text.
    #[instrument(skip_all, fields(input = input_label(input)))]
    pub async fn summarize_job_description(&self, input: &JdInput) -> Result<JobSummary> {
        let part = match input {
            JdInput::File(file) => file_part(file)?,
            JdInput::Text(text) => {
                if text.trim().is_empty() {
                    return Err(HirePipeError::validation(
                        "Provide a job description file or text",
                    ));
                }
                Part::bytes(text.clone().into_bytes())
                    .file_name(PASTED_JD_FILE_NAME)
                    .mime_str("text/plain")
                    .map_err(|e| HirePipeError::validation(format!("invalid content type: {e}")))?
            }
        };

        let url = self.endpoint(SUMMARIZE_ENDPOINT);
        info!(%url, "requesting job description summary");

        let response = self
            .http
            .post(&url)
            .multipart(Form::new().part(JD_FIELD, part))
            .send()
            .await
            .map_err(|e| HirePipeError::Network(format!("{url}: {e}")))?;

        let body: SummarizeResponse = decode(&url, response).await?;
        info!(chars = body.summary.len(), "summary received");
        Ok(JobSummary::new(body.summary))
    }

    /// Upload a CV and return the backend's parsed candidate payload.
    #[instrument(skip_all, fields(file = %file.file_name))]
    pub async fn parse_cv(&self, file: &UploadedFile) -> Result<CandidateParseResult> {
        let url = self.endpoint(PARSE_CV_ENDPOINT);
        info!(%url, "uploading CV for parsing");

        let response = self
            .http
            .post(&url)
            .multipart(Form::new().part(CV_FIELD, file_part(file)?))
            .send()
            .await
            .map_err(|e| HirePipeError::Network(format!("{url}: {e}")))?;

        let value: serde_json::Value = decode(&url, response).await?;
        CandidateParseResult::new(value)
    }

    /// Score a parsed candidate against a job summary.
    #[instrument(skip_all)]
    pub async fn match_candidate(
        &self,
        summary: &JobSummary,
        candidate: &CandidateParseResult,
    ) -> Result<MatchResult> {
        let url = self.endpoint(MATCH_ENDPOINT);
        info!(%url, "requesting candidate match");

        let response = self
            .http
            .post(&url)
            .json(&MatchRequest {
                jd_summary: summary,
                candidate_data: candidate,
            })
            .send()
            .await
            .map_err(|e| HirePipeError::Network(format!("{url}: {e}")))?;

        let result: MatchResult = decode(&url, response).await?;
        let result = result.validated()?;
        info!(score = result.match_score, "match received");
        Ok(result)
    }

    /// Ask the backend to email an interview invitation.
    #[instrument(skip_all, fields(match_score))]
    pub async fn send_interview_invitation(
        &self,
        email: &str,
        candidate_name: &str,
        match_score: f64,
    ) -> Result<InvitationReceipt> {
        let url = self.endpoint(INVITATION_ENDPOINT);
        let score = match_score.to_string();
        info!(%url, "sending interview invitation");

        let response = self
            .http
            .post(&url)
            .query(&[
                ("email", email),
                ("candidate_name", candidate_name),
                ("match_score", score.as_str()),
            ])
            .send()
            .await
            .map_err(|e| HirePipeError::Network(format!("{url}: {e}")))?;

        let receipt: InvitationReceipt = decode(&url, response).await?;
        info!(message = %receipt.message, "invitation acknowledged");
        Ok(receipt)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn input_label(input: &JdInput) -> &'static str {
    match input {
        JdInput::File(_) => "file",
        JdInput::Text(_) => "text",
    }
}

fn file_part(file: &UploadedFile) -> Result<Part> {
    Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(file.content_type)
        .map_err(|e| HirePipeError::validation(format!("invalid content type: {e}")))
}

/// Decode a success body, or turn a failure status into [`HirePipeError::Upstream`].
async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let detail = wire::extract_detail(&body);
        warn!(%url, %status, detail = detail.as_deref().unwrap_or(""), "backend returned an error");
        return Err(HirePipeError::Upstream {
            status: status.as_u16(),
            detail,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| HirePipeError::Network(format!("{url}: failed to read body: {e}")))?;

    serde_json::from_str(&body)
        .map_err(|e| HirePipeError::invalid_response(format!("{url}: {e}")))
}
