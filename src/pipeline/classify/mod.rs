//! Classifier ensemble: keyword heuristic, optional ML endpoint, LLM fallback.
//!
//! The cascade is a fold over an ordered list of stages. Each stage either
//! yields a `Verdict` or a `Degraded` reason; the first verdict that clears
//! its stage's acceptance threshold ends the fold. ML and LLM failures never
//! abort classification.

pub mod heuristic;
pub mod labels;

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;

use serde::Deserialize;

use super::services::{truncate_chars, with_retry, LlmClient, MlClassifier};
use crate::models::{ClassificationResult, ClassificationSource, Degradation, DocumentType};
use crate::pipeline_config::ClassifierConfig;

/// Token cap for the label-only LLM answer.
const LLM_LABEL_MAX_TOKENS: u32 = 64;

/// One stage's answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub label: DocumentType,
    pub score: f32,
    pub source: ClassificationSource,
}

/// A stage that could not answer normally. `fallback` carries the answer the
/// stage still stands behind, if any (LLM parse failure → Unknown).
#[derive(Debug, Clone, PartialEq)]
pub struct Degraded {
    pub stage: ClassificationSource,
    pub reason: String,
    pub fallback: Option<Verdict>,
}

impl Degraded {
    fn new(stage: ClassificationSource, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
            fallback: None,
        }
    }
}

const CASCADE: [ClassificationSource; 3] = [
    ClassificationSource::Heuristic,
    ClassificationSource::Ml,
    ClassificationSource::Llm,
];

/// Fold state carried between stages.
#[derive(Default)]
struct CascadeState {
    best: Option<Verdict>,
    trace: BTreeMap<ClassificationSource, f32>,
    degradations: Vec<Degradation>,
}

impl CascadeState {
    /// Earlier stages win ties.
    fn keep_best(&mut self, verdict: Verdict) {
        if self.best.map_or(true, |b| verdict.score > b.score) {
            self.best = Some(verdict);
        }
    }

    fn finish(self, verdict: Verdict) -> ClassificationResult {
        ClassificationResult {
            label: verdict.label,
            score: verdict.score,
            source: verdict.source,
            trace: self.trace,
            degradations: self.degradations,
        }
    }
}

pub struct ClassifierEnsemble {
    config: ClassifierConfig,
    ml: Option<Arc<dyn MlClassifier + Send + Sync>>,
    llm: Option<Arc<dyn LlmClient + Send + Sync>>,
    max_retries: u32,
}

impl ClassifierEnsemble {
    /// Heuristic-only ensemble. Attach model stages with `with_ml`/`with_llm`.
    pub fn new(config: ClassifierConfig, max_retries: u32) -> Self {
        Self {
            config,
            ml: None,
            llm: None,
            max_retries,
        }
    }

    pub fn with_ml(mut self, ml: Arc<dyn MlClassifier + Send + Sync>) -> Self {
        self.ml = Some(ml);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        let flow = CASCADE
            .iter()
            .try_fold(CascadeState::default(), |mut state, &stage| {
                let outcome = match self.run_stage(stage, text) {
                    Some(outcome) => outcome,
                    None => return ControlFlow::Continue(state),
                };

                let verdict = match outcome {
                    Ok(verdict) => verdict,
                    Err(degraded) => {
                        tracing::warn!(
                            stage = %degraded.stage,
                            reason = %degraded.reason,
                            "Classification stage degraded"
                        );
                        state.degradations.push(Degradation::ClassificationDegraded {
                            stage: degraded.stage,
                            reason: degraded.reason,
                        });
                        // A fallback answer is evidence, never an acceptance.
                        if let Some(fallback) = degraded.fallback {
                            state.trace.insert(stage, fallback.score);
                            state.keep_best(fallback);
                        }
                        return ControlFlow::Continue(state);
                    }
                };

                state.trace.insert(stage, verdict.score);
                if verdict.score >= self.accept_threshold(stage) {
                    tracing::info!(
                        label = %verdict.label,
                        score = verdict.score,
                        source = %verdict.source,
                        "Classification accepted"
                    );
                    return ControlFlow::Break(state.finish(verdict));
                }
                state.keep_best(verdict);
                ControlFlow::Continue(state)
            });

        match flow {
            ControlFlow::Break(result) => result,
            ControlFlow::Continue(mut state) => {
                let verdict = state.best.take().unwrap_or(Verdict {
                    label: DocumentType::Unknown,
                    score: self.config.unknown_baseline,
                    source: ClassificationSource::Heuristic,
                });
                tracing::info!(
                    label = %verdict.label,
                    score = verdict.score,
                    source = %verdict.source,
                    "Classification fell back to best available evidence"
                );
                state.finish(verdict)
            }
        }
    }

    /// A parsed LLM answer is the last arbiter and always accepted.
    fn accept_threshold(&self, stage: ClassificationSource) -> f32 {
        match stage {
            ClassificationSource::Heuristic => self.config.heuristic_accept,
            ClassificationSource::Ml => self.config.ml_accept,
            ClassificationSource::Llm => 0.0,
        }
    }

    /// `None` when the stage is not configured.
    fn run_stage(
        &self,
        stage: ClassificationSource,
        text: &str,
    ) -> Option<Result<Verdict, Degraded>> {
        match stage {
            ClassificationSource::Heuristic => {
                Some(Ok(heuristic::classify_heuristic(text, &self.config)))
            }
            ClassificationSource::Ml => self.ml.as_deref().map(|ml| self.run_ml(ml, text)),
            ClassificationSource::Llm => self.llm.as_deref().map(|llm| self.run_llm(llm, text)),
        }
    }

    fn run_ml(
        &self,
        ml: &(dyn MlClassifier + Send + Sync),
        text: &str,
    ) -> Result<Verdict, Degraded> {
        let input = truncate_chars(text, self.config.ml_max_chars);
        let predictions = with_retry("classify.ml", self.max_retries, || ml.classify(input))
            .map_err(|e| Degraded::new(ClassificationSource::Ml, e.to_string()))?;

        let top = predictions
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| Degraded::new(ClassificationSource::Ml, "no predictions returned"))?;

        let label = labels::parse_label(&top.label).ok_or_else(|| {
            Degraded::new(
                ClassificationSource::Ml,
                format!("unrecognized label '{}'", top.label),
            )
        })?;

        Ok(Verdict {
            label,
            score: top.score.clamp(0.0, 1.0),
            source: ClassificationSource::Ml,
        })
    }

    fn run_llm(
        &self,
        llm: &(dyn LlmClient + Send + Sync),
        text: &str,
    ) -> Result<Verdict, Degraded> {
        let prompt = build_label_prompt(truncate_chars(text, self.config.llm_max_chars));
        let response = with_retry("classify.llm", self.max_retries, || {
            llm.complete(&prompt, LLM_LABEL_MAX_TOKENS, 0.0)
        })
        .map_err(|e| Degraded::new(ClassificationSource::Llm, e.to_string()))?;

        parse_label_response(&response).map_err(|reason| Degraded {
            stage: ClassificationSource::Llm,
            reason: format!("unparseable label response: {reason}"),
            fallback: Some(Verdict {
                label: DocumentType::Unknown,
                score: self.config.llm_parse_fallback,
                source: ClassificationSource::Llm,
            }),
        })
    }
}

fn build_label_prompt(text: &str) -> String {
    format!(
        "Classify the following document into exactly one of these labels: {labels}.\n\
         Respond with JSON only, in the form {{\"label\": \"<label>\", \"confidence\": <0.0-1.0>}}.\n\n\
         Document:\n{text}",
        labels = labels::label_list(),
    )
}

#[derive(Deserialize)]
struct LabelResponse {
    label: String,
    confidence: f32,
}

/// Strict parse: the whole response (optionally inside a code fence) must be
/// the `{label, confidence}` object.
fn parse_label_response(response: &str) -> Result<Verdict, String> {
    let body = strip_code_fence(response);
    let parsed: LabelResponse = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let label = labels::parse_label(&parsed.label)
        .ok_or_else(|| format!("unknown label '{}'", parsed.label))?;
    Ok(Verdict {
        label,
        score: parsed.confidence.clamp(0.0, 1.0),
        source: ClassificationSource::Llm,
    })
}

fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
