//! Result assembly: folds merged fields, the validation report and the
//! evidence gathered along the way into one `ExtractionResult`.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use super::extract::LayerRun;
use super::merge::{confidence, MergeOutcome};
use super::validate;
use crate::models::{
    ClassificationResult, Degradation, DocumentType, ExtractionResult, ExtractionStrategy,
    ProcessingMetadata, SourceLayer, StageRecord, TemplateMatch, ValidationReport,
};

/// Everything known about one document once validation has run.
pub struct Evidence {
    pub document_id: Uuid,
    pub document_type: DocumentType,
    pub classification: ClassificationResult,
    pub template: TemplateMatch,
    pub strategy: ExtractionStrategy,
    pub layers: LayerRun,
    pub merged: MergeOutcome,
    pub validation: ValidationReport,
    pub stages: Vec<StageRecord>,
}

pub fn assemble(evidence: Evidence) -> ExtractionResult {
    let Evidence {
        document_id,
        document_type,
        classification,
        template,
        strategy,
        layers,
        merged,
        validation,
        stages,
    } = evidence;

    let degradations = collect_degradations(&classification, &layers, &validation);
    let layers_invoked = layers.layers_invoked();

    let mut layer_field_counts: BTreeMap<SourceLayer, usize> =
        layers_invoked.iter().map(|l| (*l, 0)).collect();
    for field in merged.fields.values() {
        *layer_field_counts.entry(field.source).or_insert(0) += 1;
    }

    let metadata = ProcessingMetadata {
        classification: Some(classification),
        template: Some(template),
        strategy,
        layers: layers.reports,
        layers_invoked,
        layer_field_counts,
        overall_confidence: confidence::overall_confidence(merged.fields.values()),
        conflict_count: merged.conflicts.len(),
        degradations,
        stages,
        processed_at: Utc::now(),
    };

    tracing::info!(
        doc_id = %document_id,
        doc_type = %document_type,
        fields = merged.fields.len(),
        overall_confidence = metadata.overall_confidence,
        needs_review = validation.needs_review,
        "Extraction result assembled"
    );

    ExtractionResult {
        document_id,
        document_type,
        fields: merged.fields,
        validation,
        metadata,
    }
}

/// Classification, layer and validation degradations, in pipeline order.
pub fn collect_degradations(
    classification: &ClassificationResult,
    layers: &LayerRun,
    validation: &ValidationReport,
) -> Vec<Degradation> {
    classification
        .degradations
        .iter()
        .chain(layers.degradations.iter())
        .cloned()
        .chain(validate::degradations(validation))
        .collect()
}
