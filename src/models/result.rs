use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classification::{ClassificationResult, TemplateMatch};
use super::enums::{ClassificationSource, DocumentType, ExtractionStrategy, SourceLayer, StageName};
use super::field::{FieldValue, MergedField};

/// A non-fatal (or, for `OcrFailure`, fatal) condition surfaced in metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// No readable text could be recovered. Fatal.
    OcrFailure { reason: String },
    /// An ML or LLM classification stage was unavailable or failed.
    ClassificationDegraded {
        stage: ClassificationSource,
        reason: String,
    },
    /// An extraction layer erred and contributed zero proposals.
    LayerFailure { layer: SourceLayer, reason: String },
    /// A model response could not be parsed as JSON.
    ParseFailure { context: String, reason: String },
    /// A domain audit failed. Forces review.
    ValidationError { audit: String, message: String },
}

impl Degradation {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OcrFailure { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
    /// Post-merge failure serious enough to fail the document.
    Fatal,
}

/// One finding from a domain audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub audit: String,
    pub severity: Severity,
    pub fields: Vec<String>,
    pub message: String,
    pub expected: Option<f64>,
    pub actual: Option<f64>,
}

impl AuditFinding {
    pub fn new(audit: &str, severity: Severity, fields: &[&str], message: String) -> Self {
        Self {
            audit: audit.to_string(),
            severity,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            message,
            expected: None,
            actual: None,
        }
    }

    pub fn with_amounts(mut self, expected: f64, actual: f64) -> Self {
        self.expected = Some(expected);
        self.actual = Some(actual);
        self
    }
}

/// Per-document validation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub findings: Vec<AuditFinding>,
    pub completeness_score: f32,
    pub missing_fields: Vec<String>,
    pub needs_review: bool,
}

impl ValidationReport {
    pub fn has_fatal(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Fatal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LayerStatus {
    Completed,
    Skipped { reason: String },
    Failed { reason: String },
}

/// What one extraction layer did for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerReport {
    pub layer: SourceLayer,
    pub status: LayerStatus,
    pub proposals: usize,
}

impl LayerReport {
    pub fn was_invoked(&self) -> bool {
        !matches!(self.status, LayerStatus::Skipped { .. })
    }
}

/// One lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageName,
    pub layer: Option<SourceLayer>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub classification: Option<ClassificationResult>,
    pub template: Option<TemplateMatch>,
    pub strategy: ExtractionStrategy,
    pub layers: Vec<LayerReport>,
    pub layers_invoked: Vec<SourceLayer>,
    pub layer_field_counts: BTreeMap<SourceLayer, usize>,
    pub overall_confidence: f32,
    pub conflict_count: usize,
    pub degradations: Vec<Degradation>,
    pub stages: Vec<StageRecord>,
    pub processed_at: DateTime<Utc>,
}

/// Terminal, persisted artifact for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: Uuid,
    pub document_type: DocumentType,
    pub fields: BTreeMap<String, MergedField>,
    pub validation: ValidationReport,
    pub metadata: ProcessingMetadata,
}

impl ExtractionResult {
    pub fn field(&self, key: &str) -> Option<&MergedField> {
        self.fields.get(key)
    }

    pub fn value_of(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key).map(|f| &f.value)
    }

    pub fn needs_review(&self) -> bool {
        self.validation.needs_review
    }
}

/// Explicit failure status handed back instead of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedExtraction {
    pub document_id: Uuid,
    pub stage_reached: StageName,
    pub reason: String,
    pub degradations: Vec<Degradation>,
    pub stages: Vec<StageRecord>,
}

/// What callers of the processor always receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Completed(Box<ExtractionResult>),
    Failed(FailedExtraction),
    /// A long-running analysis job was started; resume with the job id.
    Pending { document_id: Uuid, job_id: String },
}

impl ExtractionOutcome {
    pub fn document_id(&self) -> Uuid {
        match self {
            Self::Completed(r) => r.document_id,
            Self::Failed(f) => f.document_id,
            Self::Pending { document_id, .. } => *document_id,
        }
    }

    pub fn completed(&self) -> Option<&ExtractionResult> {
        match self {
            Self::Completed(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ocr_failure_is_fatal() {
        assert!(Degradation::OcrFailure { reason: "blank".into() }.is_fatal());
        assert!(!Degradation::LayerFailure {
            layer: SourceLayer::Llm,
            reason: "timeout".into()
        }
        .is_fatal());
    }

    #[test]
    fn degradation_serializes_with_kind_tag() {
        let d = Degradation::ParseFailure {
            context: "extract.llm".into(),
            reason: "no object".into(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "parse_failure");
        assert_eq!(json["context"], "extract.llm");
    }

    #[test]
    fn severity_orders_fatal_highest() {
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn skipped_layer_was_not_invoked() {
        let report = LayerReport {
            layer: SourceLayer::Query,
            status: LayerStatus::Skipped { reason: "llm_only".into() },
            proposals: 0,
        };
        assert!(!report.was_invoked());
    }
}
