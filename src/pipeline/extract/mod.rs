//! Extraction orchestrator: runs the structured-query, generative and regex
//! layers in precedence order. Each layer is fallible on its own; a failed
//! layer contributes zero proposals and the next layer still runs.

pub mod llm_layer;
pub mod query_layer;
pub mod regex_layer;
pub mod values;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use thiserror::Error;

use super::services::{DocumentAnalyzer, LlmClient, ServiceError};
use crate::models::catalog::{self, DocumentProfile, FieldSpec};
use crate::models::{
    Degradation, Document, DocumentType, ExtractionStrategy, FieldProposal, LayerReport,
    LayerStatus, SourceLayer, TextCorpus,
};
use crate::pipeline_config::ExtractionConfig;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Could not parse model response: {0}")]
    Parse(String),
}

/// Everything the layers produced for one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerRun {
    pub proposals: Vec<FieldProposal>,
    pub reports: Vec<LayerReport>,
    pub degradations: Vec<Degradation>,
}

impl LayerRun {
    fn record(&mut self, layer: SourceLayer, result: Result<Vec<FieldProposal>, ExtractionError>) {
        match result {
            Ok(proposals) => {
                tracing::info!(layer = %layer, proposals = proposals.len(), "Extraction layer completed");
                self.reports.push(LayerReport {
                    layer,
                    status: LayerStatus::Completed,
                    proposals: proposals.len(),
                });
                self.proposals.extend(proposals);
            }
            Err(e) => {
                tracing::warn!(layer = %layer, error = %e, "Extraction layer failed");
                let reason = e.to_string();
                self.degradations.push(match e {
                    ExtractionError::Parse(_) => Degradation::ParseFailure {
                        context: format!("extract.{layer}"),
                        reason: reason.clone(),
                    },
                    ExtractionError::Service(_) => Degradation::LayerFailure {
                        layer,
                        reason: reason.clone(),
                    },
                });
                self.reports.push(LayerReport {
                    layer,
                    status: LayerStatus::Failed { reason },
                    proposals: 0,
                });
            }
        }
    }

    fn skip(&mut self, layer: SourceLayer, reason: &str) {
        tracing::debug!(layer = %layer, reason, "Extraction layer skipped");
        self.reports.push(LayerReport {
            layer,
            status: LayerStatus::Skipped {
                reason: reason.to_string(),
            },
            proposals: 0,
        });
    }

    /// Highest confidence proposed so far per field.
    fn best_confidences(&self) -> BTreeMap<&str, f32> {
        let mut best: BTreeMap<&str, f32> = BTreeMap::new();
        for p in &self.proposals {
            let entry = best.entry(p.field_key.as_str()).or_insert(0.0);
            *entry = entry.max(p.confidence);
        }
        best
    }

    pub fn layers_invoked(&self) -> Vec<SourceLayer> {
        self.reports
            .iter()
            .filter(|r| r.was_invoked())
            .map(|r| r.layer)
            .collect()
    }
}

pub struct ExtractionOrchestrator {
    analyzer: Arc<dyn DocumentAnalyzer + Send + Sync>,
    llm: Option<Arc<dyn LlmClient + Send + Sync>>,
    config: ExtractionConfig,
    max_retries: u32,
}

impl ExtractionOrchestrator {
    pub fn new(
        analyzer: Arc<dyn DocumentAnalyzer + Send + Sync>,
        llm: Option<Arc<dyn LlmClient + Send + Sync>>,
        config: ExtractionConfig,
        max_retries: u32,
    ) -> Self {
        Self {
            analyzer,
            llm,
            config,
            max_retries,
        }
    }

    pub fn extract(
        &self,
        document: &Document,
        corpus: &TextCorpus,
        document_type: DocumentType,
        strategy: ExtractionStrategy,
        required: &[&str],
    ) -> LayerRun {
        self.extract_with(document, corpus, document_type, strategy, required, |_| {})
    }

    /// Like `extract`, calling `on_layer` as each layer starts.
    pub fn extract_with(
        &self,
        document: &Document,
        corpus: &TextCorpus,
        document_type: DocumentType,
        strategy: ExtractionStrategy,
        required: &[&str],
        mut on_layer: impl FnMut(SourceLayer),
    ) -> LayerRun {
        let profile = catalog::profile(document_type);
        let mut run = LayerRun::default();

        // Structured queries
        if strategy == ExtractionStrategy::LlmOnly {
            run.skip(SourceLayer::Query, "strategy is llm_only");
        } else if !profile.has_structured_config() {
            run.skip(SourceLayer::Query, "no query configuration for type");
        } else {
            on_layer(SourceLayer::Query);
            let result = query_layer::run_query_layer(
                self.analyzer.as_ref(),
                document,
                profile,
                self.max_retries,
            )
            .map_err(ExtractionError::from);
            run.record(SourceLayer::Query, result);
        }

        // Generative
        match self.llm_targets(&run, profile, strategy, required) {
            Err(reason) => run.skip(SourceLayer::Llm, reason),
            Ok(targets) => match self.llm.as_deref() {
                None => run.skip(SourceLayer::Llm, "no LLM client configured"),
                Some(llm) => {
                    on_layer(SourceLayer::Llm);
                    let result = llm_layer::run_llm_layer(
                        llm,
                        document_type,
                        &targets,
                        &corpus.full_text(),
                        &self.config,
                        self.max_retries,
                    );
                    run.record(SourceLayer::Llm, result);
                }
            },
        }

        // Regex, always last
        if profile.fields.is_empty() {
            on_layer(SourceLayer::Regex);
            let proposals =
                regex_layer::run_entity_sweep(corpus, self.config.regex_confidence);
            run.record(SourceLayer::Regex, Ok(proposals));
        } else {
            on_layer(SourceLayer::Regex);
            let proposed: BTreeSet<String> =
                run.proposals.iter().map(|p| p.field_key.clone()).collect();
            let proposals = regex_layer::run_regex_layer(
                corpus,
                profile,
                &proposed,
                self.config.regex_confidence,
            );
            run.record(SourceLayer::Regex, Ok(proposals));
        }

        tracing::info!(
            doc_id = %document.id(),
            doc_type = %document_type,
            strategy = %strategy,
            proposals = run.proposals.len(),
            "Extraction complete"
        );
        run
    }

    /// Fields the generative layer should be asked for, or why it is skipped.
    /// Non-deterministic strategies ask for every field; deterministic runs
    /// only refill required fields the queries missed or answered weakly.
    fn llm_targets(
        &self,
        run: &LayerRun,
        profile: &'static DocumentProfile,
        strategy: ExtractionStrategy,
        required: &[&str],
    ) -> Result<Vec<&'static FieldSpec>, &'static str> {
        if profile.fields.is_empty() {
            return Err("no fields for type");
        }
        if strategy != ExtractionStrategy::Deterministic {
            return Ok(profile.fields.iter().collect());
        }

        let best = run.best_confidences();
        let gaps: Vec<&'static FieldSpec> = required
            .iter()
            .filter(|key| {
                best.get(*key)
                    .map_or(true, |c| *c < self.config.refill_below)
            })
            .filter_map(|key| profile.field(key))
            .collect();

        if gaps.is_empty() {
            Err("deterministic layers covered required fields")
        } else {
            tracing::debug!(gaps = gaps.len(), "Refilling required fields with LLM");
            Ok(gaps)
        }
    }
}
