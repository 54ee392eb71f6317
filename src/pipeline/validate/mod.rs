//! Post-merge validation: completeness over required fields plus pluggable
//! domain audits, folded into one `ValidationReport`.

pub mod completeness;
pub mod identifiers;
pub mod info_returns;
pub mod paystub;
pub mod wage;

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{
    AuditFinding, Degradation, DocumentType, MergedField, Severity, ValidationReport,
};
use crate::pipeline_config::ValidationConfig;

pub type FieldMap = BTreeMap<String, MergedField>;

/// One domain consistency check. Audits only read merged fields and never
/// report on fields that are absent.
pub trait DomainAudit: Send + Sync {
    fn name(&self) -> &'static str;

    fn applies_to(&self, document_type: DocumentType) -> bool;

    fn audit(
        &self,
        fields: &FieldMap,
        document_type: DocumentType,
        config: &ValidationConfig,
    ) -> Vec<AuditFinding>;
}

/// Audits keyed by the document types they apply to.
pub struct AuditRegistry {
    audits: Vec<Box<dyn DomainAudit>>,
}

impl AuditRegistry {
    pub fn empty() -> Self {
        Self { audits: Vec::new() }
    }

    pub fn register(mut self, audit: Box<dyn DomainAudit>) -> Self {
        self.audits.push(audit);
        self
    }

    pub fn for_type(&self, document_type: DocumentType) -> impl Iterator<Item = &dyn DomainAudit> + '_ {
        self.audits
            .iter()
            .map(|a| a.as_ref())
            .filter(move |a| a.applies_to(document_type))
    }

    pub fn len(&self) -> usize {
        self.audits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audits.is_empty()
    }
}

impl Default for AuditRegistry {
    fn default() -> Self {
        Self::empty()
            .register(Box::new(identifiers::IdentifierAudit))
            .register(Box::new(wage::WageStatementAudit))
            .register(Box::new(paystub::PayStatementAudit))
            .register(Box::new(info_returns::InformationReturnAudit))
    }
}

pub struct FieldValidator {
    config: ValidationConfig,
    registry: AuditRegistry,
}

impl FieldValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self::with_registry(config, AuditRegistry::default())
    }

    pub fn with_registry(config: ValidationConfig, registry: AuditRegistry) -> Self {
        Self { config, registry }
    }

    pub fn validate(&self, fields: &FieldMap, document_type: DocumentType) -> ValidationReport {
        let required = self.config.required_for(document_type);
        let completeness = completeness::score(fields, &required);

        let findings: Vec<AuditFinding> = self
            .registry
            .for_type(document_type)
            .flat_map(|audit| {
                let found = audit.audit(fields, document_type, &self.config);
                if !found.is_empty() {
                    tracing::info!(
                        audit = audit.name(),
                        findings = found.len(),
                        document_type = %document_type,
                        "Audit reported findings"
                    );
                }
                found
            })
            .collect();

        let (errors, warnings): (Vec<_>, Vec<_>) = findings
            .iter()
            .partition(|f| f.severity >= Severity::Error);
        let errors: Vec<String> = errors.into_iter().map(|f| f.message.clone()).collect();
        let mut warnings: Vec<String> = warnings.into_iter().map(|f| f.message.clone()).collect();

        // No field map to judge completeness against.
        let untyped = document_type == DocumentType::Unknown;
        if untyped {
            warnings.push("Document type could not be determined".to_string());
        }

        let has_conflicts = fields.values().any(|f| f.conflict);
        let needs_review = untyped
            || has_conflicts
            || completeness.score < self.config.review_completeness
            || !errors.is_empty();

        ValidationReport {
            errors,
            warnings,
            findings,
            completeness_score: completeness.score,
            missing_fields: completeness.missing,
            needs_review,
        }
    }
}

/// Error-or-worse findings as metadata degradations.
pub fn degradations(report: &ValidationReport) -> Vec<Degradation> {
    report
        .findings
        .iter()
        .filter(|f| f.severity >= Severity::Error)
        .map(|f| Degradation::ValidationError {
            audit: f.audit.clone(),
            message: f.message.clone(),
        })
        .collect()
}

pub(crate) fn number(fields: &FieldMap, key: &str) -> Option<f64> {
    fields.get(key).and_then(|f| f.value.as_number())
}

pub(crate) fn date(fields: &FieldMap, key: &str) -> Option<NaiveDate> {
    fields.get(key).and_then(|f| f.value.as_date())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::FieldMap;
    use crate::models::{ConfidenceTier, FieldValue, MergedField, SourceLayer};

    pub fn fields(entries: &[(&str, FieldValue)]) -> FieldMap {
        entries
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    MergedField {
                        field_key: k.to_string(),
                        value: v.clone(),
                        confidence: 0.95,
                        confidence_tier: ConfidenceTier::High,
                        source: SourceLayer::Query,
                        conflict: false,
                        alternative_values: vec![],
                    },
                )
            })
            .collect()
    }
}
