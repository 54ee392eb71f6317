//! Field merger: reconciles proposals from all layers into one value per field.
//!
//! Precedence is query > llm > regex. Within a source the higher confidence
//! wins. A higher-precedence value is only overridden by a conflicting one
//! whose confidence exceeds it by the configured margin.

pub mod confidence;
pub mod normalize;

use std::collections::BTreeMap;

use crate::models::catalog;
use crate::models::{
    AlternativeValue, DocumentType, FieldKind, FieldProposal, MergedField,
};
use crate::pipeline_config::MergeConfig;

use normalize::values_conflict;

/// Merged fields plus the keys that had conflicting proposals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub fields: BTreeMap<String, MergedField>,
    pub conflicts: Vec<String>,
}

impl MergeOutcome {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

pub struct FieldMerger {
    config: MergeConfig,
}

impl FieldMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Pure function of its inputs: the same proposal set always merges to
    /// the same fields.
    pub fn merge(&self, proposals: &[FieldProposal], document_type: DocumentType) -> MergeOutcome {
        let mut groups: BTreeMap<&str, Vec<&FieldProposal>> = BTreeMap::new();
        for p in proposals.iter().filter(|p| !p.value.is_blank()) {
            groups.entry(p.field_key.as_str()).or_default().push(p);
        }

        let profile = catalog::profile(document_type);
        let mut outcome = MergeOutcome::default();
        for (key, mut group) in groups {
            let kind = profile
                .field(key)
                .map(|f| f.kind())
                .unwrap_or_else(|| FieldKind::infer_from_key(key));

            group.sort_by(|a, b| {
                a.source_layer
                    .precedence()
                    .cmp(&b.source_layer.precedence())
                    .then(b.confidence.total_cmp(&a.confidence))
            });

            let field = self.merge_group(key, kind, &group);
            if field.conflict {
                tracing::debug!(
                    field = key,
                    alternatives = field.alternative_values.len(),
                    "Conflicting proposals"
                );
                outcome.conflicts.push(key.to_string());
            }
            outcome.fields.insert(key.to_string(), field);
        }
        outcome
    }

    /// `group` is non-empty and sorted by precedence, then confidence.
    fn merge_group(&self, key: &str, kind: FieldKind, group: &[&FieldProposal]) -> MergedField {
        let conflicts = |a: &FieldProposal, b: &FieldProposal| {
            values_conflict(kind, &a.value, &b.value, &self.config)
        };

        let top = group[0];
        let primary = group
            .iter()
            .skip(1)
            .filter(|c| {
                conflicts(top, c) && c.confidence - top.confidence >= self.config.override_margin
            })
            .fold(None::<&FieldProposal>, |best, c| match best {
                Some(b) if b.confidence >= c.confidence => Some(b),
                _ => Some(*c),
            })
            .unwrap_or(top);

        let conflict = group
            .iter()
            .enumerate()
            .any(|(i, a)| group[i + 1..].iter().any(|b| conflicts(a, b)));

        let alternative_values: Vec<AlternativeValue> = group
            .iter()
            .filter(|p| !std::ptr::eq(**p, primary) && conflicts(primary, p))
            .map(|p| AlternativeValue {
                value: p.value.clone(),
                source: p.source_layer,
                confidence: p.confidence,
            })
            .collect();

        let mut corroborating: Vec<_> = group
            .iter()
            .filter(|p| p.source_layer != primary.source_layer && !conflicts(primary, p))
            .map(|p| p.source_layer)
            .collect();
        corroborating.dedup();

        let merged_confidence = (primary.confidence
            + self.config.corroboration_bonus * corroborating.len() as f32)
            .min(1.0);

        MergedField {
            field_key: key.to_string(),
            value: primary.value.clone(),
            confidence: merged_confidence,
            confidence_tier: confidence::tier_for(merged_confidence),
            source: primary.source_layer,
            conflict,
            alternative_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceTier, FieldValue, SourceLayer};

    fn merger() -> FieldMerger {
        FieldMerger::new(MergeConfig::default())
    }

    fn p(key: &str, value: FieldValue, confidence: f32, layer: SourceLayer) -> FieldProposal {
        FieldProposal::new(key, value, confidence, layer)
    }

    fn num(n: f64) -> FieldValue {
        FieldValue::Number(n)
    }

    #[test]
    fn query_beats_regex_when_agreeing() {
        let out = merger().merge(
            &[
                p("Box1_Wages", num(50000.004), 0.6, SourceLayer::Regex),
                p("Box1_Wages", num(50000.0), 0.95, SourceLayer::Query),
            ],
            DocumentType::W2,
        );
        let f = &out.fields["Box1_Wages"];
        assert_eq!(f.value, num(50000.0));
        assert_eq!(f.source, SourceLayer::Query);
        assert!(!f.conflict);
        assert!(f.alternative_values.is_empty());
        assert!(!out.has_conflicts());
    }

    #[test]
    fn corroboration_raises_confidence() {
        let out = merger().merge(
            &[
                p("Box1_Wages", num(50000.0), 0.85, SourceLayer::Query),
                p("Box1_Wages", num(50000.0), 0.88, SourceLayer::Llm),
                p("Box1_Wages", num(50000.0), 0.6, SourceLayer::Regex),
            ],
            DocumentType::W2,
        );
        let f = &out.fields["Box1_Wages"];
        assert!((f.confidence - 0.95).abs() < 1e-6);
        assert_eq!(f.confidence_tier, ConfidenceTier::High);
    }

    #[test]
    fn conflict_keeps_precedence_and_records_alternative() {
        let out = merger().merge(
            &[
                p("Box1_Wages", num(50000.0), 0.8, SourceLayer::Query),
                p("Box1_Wages", num(5000.0), 0.88, SourceLayer::Llm),
            ],
            DocumentType::W2,
        );
        let f = &out.fields["Box1_Wages"];
        assert_eq!(f.value, num(50000.0));
        assert!(f.conflict);
        assert_eq!(f.alternative_values.len(), 1);
        assert_eq!(f.alternative_values[0].source, SourceLayer::Llm);
        assert_eq!(out.conflicts, vec!["Box1_Wages".to_string()]);
    }

    #[test]
    fn materially_weaker_precedence_is_overridden() {
        let out = merger().merge(
            &[
                p("Box1_Wages", num(500.0), 0.3, SourceLayer::Query),
                p("Box1_Wages", num(50000.0), 0.88, SourceLayer::Llm),
            ],
            DocumentType::W2,
        );
        let f = &out.fields["Box1_Wages"];
        assert_eq!(f.value, num(50000.0));
        assert_eq!(f.source, SourceLayer::Llm);
        assert!(f.conflict);
        assert_eq!(f.alternative_values[0].source, SourceLayer::Query);
    }

    #[test]
    fn confidence_breaks_ties_within_source() {
        let out = merger().merge(
            &[
                p("TaxYear", FieldValue::Text("2023".into()), 0.7, SourceLayer::Regex),
                p("TaxYear", FieldValue::Text("2024".into()), 0.9, SourceLayer::Regex),
            ],
            DocumentType::W2,
        );
        assert_eq!(out.fields["TaxYear"].value, FieldValue::Text("2024".into()));
        assert!(out.fields["TaxYear"].conflict);
    }

    #[test]
    fn blank_proposals_are_ignored() {
        let out = merger().merge(
            &[p("EmployerName", FieldValue::Text("  ".into()), 0.9, SourceLayer::Query)],
            DocumentType::W2,
        );
        assert!(out.fields.is_empty());
    }

    #[test]
    fn merge_is_idempotent() {
        let proposals = vec![
            p("Box1_Wages", num(50000.0), 0.8, SourceLayer::Query),
            p("Box1_Wages", num(49000.0), 0.88, SourceLayer::Llm),
            p("EmployeeSSN", FieldValue::Text("123-45-6789".into()), 0.6, SourceLayer::Regex),
        ];
        let m = merger();
        assert_eq!(m.merge(&proposals, DocumentType::W2), m.merge(&proposals, DocumentType::W2));
    }

    #[test]
    fn regex_only_field_is_medium() {
        let out = merger().merge(
            &[p("Box2_FederalTaxWithheld", num(8500.0), 0.6, SourceLayer::Regex)],
            DocumentType::W2,
        );
        let f = &out.fields["Box2_FederalTaxWithheld"];
        assert_eq!(f.confidence_tier, ConfidenceTier::Medium);
        assert_eq!(f.source, SourceLayer::Regex);
    }
}
