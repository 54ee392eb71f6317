//! In-process collaborators for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{
    Analysis, AnalysisFeature, DocumentAnalyzer, JobStatus, LlmClient, MlClassifier, Prediction,
    QueryAnswer, ServiceError,
};
use crate::models::TextLine;

/// Mock LLM client: replays queued responses, then repeats a fallback.
pub struct MockLlmClient {
    queued: Mutex<VecDeque<Result<String, ServiceError>>>,
    fallback: Result<String, ServiceError>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self::with_fallback(Ok(response.to_string()))
    }

    pub fn failing(error: ServiceError) -> Self {
        Self::with_fallback(Err(error))
    }

    fn with_fallback(fallback: Result<String, ServiceError>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response returned before the fallback.
    pub fn then(self, response: Result<String, ServiceError>) -> Self {
        self.queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl LlmClient for MockLlmClient {
    fn complete(
        &self,
        prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        self.queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Mock analysis service with fixed lines and query answers.
pub struct MockAnalyzer {
    lines: Vec<TextLine>,
    answers: Vec<QueryAnswer>,
    text_error: Option<ServiceError>,
    query_error: Option<ServiceError>,
    polls_until_ready: usize,
    polls: AtomicUsize,
    calls: AtomicUsize,
}

impl MockAnalyzer {
    pub fn new(lines: Vec<TextLine>) -> Self {
        Self {
            lines,
            answers: Vec::new(),
            text_error: None,
            query_error: None,
            polls_until_ready: 0,
            polls: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Lines recognized at a uniform 0.95 confidence.
    pub fn from_text(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|l| TextLine::new(*l, 0.95)).collect())
    }

    pub fn with_answer(mut self, alias: &str, text: &str, confidence: f32) -> Self {
        self.answers.push(QueryAnswer {
            alias: alias.to_string(),
            text: text.to_string(),
            confidence,
        });
        self
    }

    pub fn failing_text(mut self, error: ServiceError) -> Self {
        self.text_error = Some(error);
        self
    }

    pub fn failing_queries(mut self, error: ServiceError) -> Self {
        self.query_error = Some(error);
        self
    }

    /// Jobs report `InProgress` for this many polls before succeeding.
    pub fn with_job_delay(mut self, polls: usize) -> Self {
        self.polls_until_ready = polls;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentAnalyzer for MockAnalyzer {
    fn analyze(
        &self,
        _bytes: &[u8],
        features: &[AnalysisFeature],
    ) -> Result<Analysis, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut analysis = Analysis::default();

        for feature in features {
            match feature {
                AnalysisFeature::Text => {
                    if let Some(e) = &self.text_error {
                        return Err(e.clone());
                    }
                    analysis.lines = self.lines.clone();
                }
                AnalysisFeature::Queries { queries } => {
                    if let Some(e) = &self.query_error {
                        return Err(e.clone());
                    }
                    analysis.query_answers = self
                        .answers
                        .iter()
                        .filter(|a| queries.iter().any(|q| q.alias == a.alias))
                        .cloned()
                        .collect();
                }
            }
        }

        Ok(analysis)
    }

    fn start_job(
        &self,
        _bytes: &[u8],
        _features: &[AnalysisFeature],
    ) -> Result<String, ServiceError> {
        if let Some(e) = &self.text_error {
            return Err(e.clone());
        }
        Ok("mock-job-1".to_string())
    }

    fn poll_job(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        let polled = self.polls.fetch_add(1, Ordering::SeqCst);
        if job_id != "mock-job-1" {
            return Ok(JobStatus::Failed {
                reason: format!("unknown job {job_id}"),
            });
        }
        if polled < self.polls_until_ready {
            return Ok(JobStatus::InProgress);
        }
        Ok(JobStatus::Succeeded {
            analysis: Analysis {
                lines: self.lines.clone(),
                query_answers: Vec::new(),
            },
        })
    }
}

/// Mock ML endpoint returning fixed predictions.
pub struct MockMlClassifier {
    result: Result<Vec<Prediction>, ServiceError>,
    calls: AtomicUsize,
}

impl MockMlClassifier {
    pub fn new(label: &str, score: f32) -> Self {
        Self {
            result: Ok(vec![Prediction {
                label: label.to_string(),
                score,
            }]),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: ServiceError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MlClassifier for MockMlClassifier {
    fn classify(&self, _text: &str) -> Result<Vec<Prediction>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}
