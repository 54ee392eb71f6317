//! Collaborator contracts consumed by the core: document analysis (OCR and
//! structured queries), generative text completion, and an optional ML
//! classification endpoint. All are injected as trait objects.

pub mod ml_http;
pub mod mock;
pub mod ollama;

pub use ml_http::*;
pub use mock::*;
pub use ollama::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::TextLine;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Service is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Service returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Malformed service response: {0}")]
    MalformedResponse(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Analysis job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },
}

impl ServiceError {
    /// Transport failures and 5xx/429 are worth one more attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// What the analysis service should return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "feature", rename_all = "snake_case")]
pub enum AnalysisFeature {
    /// Recognized lines with confidences.
    Text,
    /// Natural-language queries answered against the page.
    Queries { queries: Vec<StructuredQuery> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    /// Echoed back on the answer; the field key.
    pub alias: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub alias: String,
    pub text: String,
    /// Service-reported confidence, either [0, 1] or [0, 100].
    pub confidence: f32,
}

/// Output of one analysis call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub lines: Vec<TextLine>,
    pub query_answers: Vec<QueryAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    InProgress,
    Succeeded { analysis: Analysis },
    Failed { reason: String },
}

/// OCR / document-analysis service.
pub trait DocumentAnalyzer {
    /// Immediate (synchronous) analysis.
    fn analyze(&self, bytes: &[u8], features: &[AnalysisFeature])
        -> Result<Analysis, ServiceError>;

    /// Start a long-running analysis job; returns its id.
    fn start_job(&self, bytes: &[u8], features: &[AnalysisFeature])
        -> Result<String, ServiceError>;

    /// Poll a job started with `start_job`.
    fn poll_job(&self, job_id: &str) -> Result<JobStatus, ServiceError>;
}

/// Generative text completion service.
pub trait LlmClient {
    fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32)
        -> Result<String, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

/// Optional trained classification endpoint.
pub trait MlClassifier {
    fn classify(&self, text: &str) -> Result<Vec<Prediction>, ServiceError>;
}

/// Run `call`, retrying retryable errors up to `max_retries` more times.
/// Never retries unboundedly; the last error is returned.
pub fn with_retry<T>(
    operation: &str,
    max_retries: u32,
    mut call: impl FnMut() -> Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    let mut attempt = 0;
    loop {
        match call() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    operation,
                    attempt,
                    error = %e,
                    "Service call failed, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
