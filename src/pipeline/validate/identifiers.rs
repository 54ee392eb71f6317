//! Taxpayer identifier shape checks, for every document type.

use super::{DomainAudit, FieldMap};
use crate::models::catalog;
use crate::models::{AuditFinding, DocumentType, FieldKind, FieldValue, Severity};
use crate::pipeline_config::ValidationConfig;

const AUDIT: &str = "identifiers";
const IDENTIFIER_DIGITS: usize = 9;

pub struct IdentifierAudit;

/// SSN, EIN and TIN values carry exactly nine digits once separators are
/// stripped.
pub fn is_well_formed(value: &FieldValue) -> bool {
    let raw = match value {
        FieldValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 => format!("{n:.0}"),
        other => other.to_string(),
    };
    let digits = raw.chars().filter(char::is_ascii_digit).count();
    let stray = raw
        .chars()
        .any(|c| !(c.is_ascii_digit() || c == '-' || c == ' '));
    digits == IDENTIFIER_DIGITS && !stray
}

fn is_taxpayer_id(kind: FieldKind) -> bool {
    matches!(kind, FieldKind::Ssn | FieldKind::Ein | FieldKind::Tin)
}

impl DomainAudit for IdentifierAudit {
    fn name(&self) -> &'static str {
        AUDIT
    }

    fn applies_to(&self, _document_type: DocumentType) -> bool {
        true
    }

    fn audit(
        &self,
        fields: &FieldMap,
        document_type: DocumentType,
        _config: &ValidationConfig,
    ) -> Vec<AuditFinding> {
        let mut findings: Vec<AuditFinding> = fields
            .values()
            .filter(|f| is_taxpayer_id(FieldKind::infer_from_key(&f.field_key)))
            .filter(|f| !is_well_formed(&f.value))
            .map(|f| {
                AuditFinding::new(
                    AUDIT,
                    Severity::Error,
                    &[f.field_key.as_str()],
                    format!("{} '{}' is not a 9-digit identifier", f.field_key, f.value),
                )
            })
            .collect();

        let core = catalog::profile(document_type).core_identifiers;
        let present: Vec<&str> = core
            .iter()
            .copied()
            .filter(|key| fields.contains_key(*key))
            .collect();
        let all_malformed = !present.is_empty()
            && present
                .iter()
                .all(|key| fields.get(*key).is_some_and(|f| !is_well_formed(&f.value)));

        if all_malformed {
            findings.push(AuditFinding::new(
                AUDIT,
                Severity::Fatal,
                &present,
                format!("No usable core identifier among {}", present.join(", ")),
            ));
        }

        findings
    }
}
