//! Document processor: single entry point that drives one document through
//! corpus → classify → template → extract → merge → validate → assemble.
//!
//! Collaborators are injected as trait objects so the whole pipeline runs
//! against mocks in tests. No error crosses this boundary: callers always get
//! an `ExtractionOutcome`.

use std::sync::Arc;

use super::assemble::{self, Evidence};
use super::classify::ClassifierEnsemble;
use super::corpus::{self, TextCorpusAdapter};
use super::extract::ExtractionOrchestrator;
use super::lifecycle::Lifecycle;
use super::merge::FieldMerger;
use super::services::{
    with_retry, AnalysisFeature, DocumentAnalyzer, HttpMlClassifier, JobStatus, LlmClient,
    MlClassifier, OllamaClient, ServiceError,
};
use super::template::TemplateMatcher;
use super::validate::FieldValidator;
use super::PipelineError;
use crate::models::{
    Degradation, Document, DocumentType, ExtractionOutcome, FailedExtraction, MediaCategory,
    Severity, StageName, TextCorpus,
};
use crate::pipeline_config::PipelineConfig;

/// External services the pipeline consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub analyzer: Arc<dyn DocumentAnalyzer + Send + Sync>,
    pub llm: Option<Arc<dyn LlmClient + Send + Sync>>,
    pub ml: Option<Arc<dyn MlClassifier + Send + Sync>>,
}

impl Collaborators {
    /// Analyzer only; the LLM and ML stages degrade as unavailable.
    pub fn analyzer_only(analyzer: Arc<dyn DocumentAnalyzer + Send + Sync>) -> Self {
        Self {
            analyzer,
            llm: None,
            ml: None,
        }
    }

    /// Analyzer plus the HTTP clients named in the service configuration.
    pub fn from_config(
        analyzer: Arc<dyn DocumentAnalyzer + Send + Sync>,
        config: &PipelineConfig,
    ) -> Result<Self, ServiceError> {
        let llm: Arc<dyn LlmClient + Send + Sync> =
            Arc::new(OllamaClient::from_config(&config.services)?);
        let ml = match &config.services.ml_endpoint {
            Some(endpoint) => {
                let client: Arc<dyn MlClassifier + Send + Sync> = Arc::new(HttpMlClassifier::new(
                    endpoint,
                    config.services.timeout_secs,
                )?);
                Some(client)
            }
            None => None,
        };
        Ok(Self {
            analyzer,
            llm: Some(llm),
            ml,
        })
    }
}

pub struct DocumentProcessor {
    analyzer: Arc<dyn DocumentAnalyzer + Send + Sync>,
    classifier: ClassifierEnsemble,
    templates: TemplateMatcher,
    extractor: ExtractionOrchestrator,
    merger: FieldMerger,
    validator: FieldValidator,
    config: PipelineConfig,
}

impl DocumentProcessor {
    pub fn new(config: PipelineConfig, collaborators: Collaborators) -> Self {
        let max_retries = config.services.max_retries;

        let mut classifier = ClassifierEnsemble::new(config.classifier.clone(), max_retries);
        if let Some(ml) = &collaborators.ml {
            classifier = classifier.with_ml(Arc::clone(ml));
        }
        if let Some(llm) = &collaborators.llm {
            classifier = classifier.with_llm(Arc::clone(llm));
        }

        let extractor = ExtractionOrchestrator::new(
            Arc::clone(&collaborators.analyzer),
            collaborators.llm.clone(),
            config.extraction.clone(),
            max_retries,
        );

        Self {
            analyzer: collaborators.analyzer,
            classifier,
            templates: TemplateMatcher::new(config.template.clone()),
            extractor,
            merger: FieldMerger::new(config.merge.clone()),
            validator: FieldValidator::new(config.validation.clone()),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one document. Large scanned documents start an analysis job
    /// and come back `Pending`; resume them with [`Self::resume`].
    pub fn process(&self, document: &Document) -> ExtractionOutcome {
        let span = tracing::info_span!("process_document", doc_id = %document.id());
        let _guard = span.enter();

        tracing::info!(
            media = %document.media(),
            bytes = document.size(),
            pages = ?document.page_count(),
            "Processing document"
        );

        if self.needs_job(document) {
            match with_retry("analyze.start_job", self.config.services.max_retries, || {
                self.analyzer.start_job(document.bytes(), &[AnalysisFeature::Text])
            }) {
                Ok(job_id) => {
                    tracing::info!(job_id = %job_id, "Analysis job started");
                    return ExtractionOutcome::Pending {
                        document_id: document.id(),
                        job_id,
                    };
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Could not start analysis job, analyzing inline");
                }
            }
        }

        let mut lifecycle = Lifecycle::new();
        let adapter = TextCorpusAdapter::new(self.analyzer.as_ref(), self.config.services.max_retries);
        match adapter.corpus_for(document) {
            Ok(corpus) => self.run(document, &corpus, lifecycle),
            Err(e) => {
                tracing::warn!(error = %e, "No readable text");
                Self::fail(document, &mut lifecycle, e.to_string(), vec![ocr_failure(&e)])
            }
        }
    }

    /// Poll a pending analysis job once and continue when it has finished.
    pub fn resume(&self, document: &Document, job_id: &str) -> ExtractionOutcome {
        let span = tracing::info_span!("process_document", doc_id = %document.id(), job_id);
        let _guard = span.enter();

        let status = with_retry("analyze.poll_job", self.config.services.max_retries, || {
            self.analyzer.poll_job(job_id)
        });

        let mut lifecycle = Lifecycle::new();
        let failure = match status {
            Ok(JobStatus::InProgress) => {
                tracing::debug!("Analysis job still running");
                return ExtractionOutcome::Pending {
                    document_id: document.id(),
                    job_id: job_id.to_string(),
                };
            }
            Ok(JobStatus::Succeeded { analysis }) => {
                let corpus = corpus::from_analysis(&analysis);
                if !corpus.is_empty() {
                    return self.run(document, &corpus, lifecycle);
                }
                PipelineError::OcrFailure("analysis job returned no readable lines".into())
            }
            Ok(JobStatus::Failed { reason }) => PipelineError::OcrFailure(
                ServiceError::JobFailed {
                    job_id: job_id.to_string(),
                    reason,
                }
                .to_string(),
            ),
            Err(e) => PipelineError::OcrFailure(e.to_string()),
        };

        tracing::warn!(error = %failure, "Analysis job did not produce text");
        Self::fail(document, &mut lifecycle, failure.to_string(), vec![ocr_failure(&failure)])
    }

    fn needs_job(&self, document: &Document) -> bool {
        if document.media() == MediaCategory::PlainText {
            return false;
        }
        let jobs = &self.config.jobs;
        document
            .page_count()
            .is_some_and(|pages| pages > jobs.async_page_threshold)
            || document.size() > jobs.async_byte_threshold
    }

    fn run(&self, document: &Document, corpus: &TextCorpus, mut lifecycle: Lifecycle) -> ExtractionOutcome {
        match self.run_stages(document, corpus, &mut lifecycle) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, stage = %lifecycle.current(), "Pipeline aborted");
                Self::fail(document, &mut lifecycle, e.to_string(), Vec::new())
            }
        }
    }

    fn run_stages(
        &self,
        document: &Document,
        corpus: &TextCorpus,
        lifecycle: &mut Lifecycle,
    ) -> Result<ExtractionOutcome, PipelineError> {
        let text = corpus.full_text();

        let classification = self.classifier.classify(&text);
        lifecycle.advance(StageName::Classified)?;

        let template = match classification.label {
            DocumentType::Unknown => self.templates.match_text(&text),
            label => self.templates.match_for_type(&text, label),
        };
        let document_type = match classification.label {
            DocumentType::Unknown => template.document_type,
            label => label,
        };
        let strategy = template.strategy;
        tracing::info!(
            doc_type = %document_type,
            classification_source = %classification.source,
            classification_score = classification.score,
            template = %template.template,
            strategy = %strategy,
            "Document routed"
        );

        let required = self.config.required_fields(document_type);
        let layers = self.extractor.extract_with(
            document,
            corpus,
            document_type,
            strategy,
            &required,
            |layer| {
                if let Err(e) = lifecycle.extracting(layer) {
                    tracing::warn!(error = %e, "Unexpected stage transition");
                }
            },
        );

        let merged = self.merger.merge(&layers.proposals, document_type);
        lifecycle.advance(StageName::Merged)?;

        let validation = self.validator.validate(&merged.fields, document_type);
        lifecycle.advance(StageName::Validated)?;

        if validation.has_fatal() {
            let reason = validation
                .findings
                .iter()
                .filter(|f| f.severity == Severity::Fatal)
                .map(|f| f.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            tracing::warn!(reason = %reason, "Fatal validation finding");
            let degradations =
                assemble::collect_degradations(&classification, &layers, &validation);
            return Ok(Self::fail(document, lifecycle, reason, degradations));
        }

        lifecycle.advance(StageName::Completed)?;
        let result = assemble::assemble(Evidence {
            document_id: document.id(),
            document_type,
            classification,
            template,
            strategy,
            layers,
            merged,
            validation,
            stages: lifecycle.history().to_vec(),
        });
        Ok(ExtractionOutcome::Completed(Box::new(result)))
    }

    fn fail(
        document: &Document,
        lifecycle: &mut Lifecycle,
        reason: String,
        degradations: Vec<Degradation>,
    ) -> ExtractionOutcome {
        let stage_reached = lifecycle.current();
        if let Err(e) = lifecycle.advance(StageName::Failed) {
            tracing::debug!(error = %e, "Failure recorded outside a failing stage");
        }
        ExtractionOutcome::Failed(FailedExtraction {
            document_id: document.id(),
            stage_reached,
            reason,
            degradations,
            stages: lifecycle.history().to_vec(),
        })
    }
}

fn ocr_failure(error: &PipelineError) -> Degradation {
    Degradation::OcrFailure {
        reason: error.to_string(),
    }
}
