//! Laws the pipeline holds regardless of input: idempotence, precedence,
//! conflict detection, completeness bounds, the withholding audit, cascade
//! short-circuiting and per-layer fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use formsift::models::{
    ClassificationSource, ConfidenceTier, Degradation, Document, DocumentType, FieldProposal,
    FieldValue, LayerStatus, MergedField, Severity, SourceLayer,
};
use formsift::pipeline::classify::ClassifierEnsemble;
use formsift::pipeline::merge::FieldMerger;
use formsift::pipeline::services::{MockAnalyzer, MockLlmClient, MockMlClassifier};
use formsift::pipeline::validate::FieldValidator;
use formsift::pipeline_config::{ClassifierConfig, MergeConfig, ValidationConfig};
use formsift::{Collaborators, DocumentProcessor, PipelineConfig};

fn proposal(key: &str, value: FieldValue, confidence: f32, layer: SourceLayer) -> FieldProposal {
    FieldProposal::new(key, value, confidence, layer)
}

fn merged(entries: &[(&str, f64)]) -> BTreeMap<String, MergedField> {
    entries
        .iter()
        .map(|(key, value)| {
            (
                key.to_string(),
                MergedField {
                    field_key: key.to_string(),
                    value: FieldValue::Number(*value),
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

// ── Idempotence ─────────────────────────────────────────────────────────────

#[test]
fn reprocessing_yields_identical_fields() {
    let processor = DocumentProcessor::new(
        PipelineConfig::default(),
        Collaborators::analyzer_only(Arc::new(MockAnalyzer::new(vec![]))),
    );
    let doc = Document::from_text(
        "Form W-2 Wage and Tax Statement 2024\n\
         Employer identification number 12-3456789\n\
         Wages, tips, other compensation $61,250.00\n\
         Social security wages $61,250.00\n\
         Social security tax withheld $3,797.50",
    );

    let first = processor.process(&doc).completed().cloned().unwrap();
    let second = processor.process(&doc).completed().cloned().unwrap();
    assert_eq!(first.fields, second.fields);
    assert_eq!(first.validation, second.validation);
    assert_eq!(first.metadata.layers, second.metadata.layers);
}

#[test]
fn merge_ignores_proposal_order_within_sources() {
    let merger = FieldMerger::new(MergeConfig::default());
    let a = proposal("Box1_Wages", FieldValue::Number(50000.0), 0.9, SourceLayer::Query);
    let b = proposal("Box1_Wages", FieldValue::Number(50000.0), 0.88, SourceLayer::Llm);
    let c = proposal("Box1_Wages", FieldValue::Number(48000.0), 0.6, SourceLayer::Regex);

    let forward = merger.merge(&[a.clone(), b.clone(), c.clone()], DocumentType::W2);
    let reverse = merger.merge(&[c, b, a], DocumentType::W2);
    assert_eq!(forward, reverse);
}

// ── Precedence law ──────────────────────────────────────────────────────────

#[test]
fn agreeing_sources_resolve_to_highest_precedence() {
    let merger = FieldMerger::new(MergeConfig::default());
    let out = merger.merge(
        &[
            proposal("EmployeeSSN", FieldValue::Text("123456789".into()), 0.6, SourceLayer::Regex),
            proposal("EmployeeSSN", FieldValue::Text("123-45-6789".into()), 0.7, SourceLayer::Llm),
            proposal("EmployeeSSN", FieldValue::Text("123-45-6789".into()), 0.8, SourceLayer::Query),
        ],
        DocumentType::W2,
    );
    let ssn = &out.fields["EmployeeSSN"];
    assert_eq!(ssn.source, SourceLayer::Query);
    assert!(!ssn.conflict);
    assert!(ssn.confidence > 0.8);
}

#[test]
fn precedence_holds_unless_materially_outscored() {
    let merger = FieldMerger::new(MergeConfig::default());
    let held = merger.merge(
        &[
            proposal("Box1_Wages", FieldValue::Number(50000.0), 0.70, SourceLayer::Query),
            proposal("Box1_Wages", FieldValue::Number(52000.0), 0.90, SourceLayer::Llm),
        ],
        DocumentType::W2,
    );
    assert_eq!(held.fields["Box1_Wages"].source, SourceLayer::Query);

    let overridden = merger.merge(
        &[
            proposal("Box1_Wages", FieldValue::Number(50000.0), 0.50, SourceLayer::Query),
            proposal("Box1_Wages", FieldValue::Number(52000.0), 0.90, SourceLayer::Llm),
        ],
        DocumentType::W2,
    );
    assert_eq!(overridden.fields["Box1_Wages"].source, SourceLayer::Llm);
}

// ── Conflict law ────────────────────────────────────────────────────────────

#[test]
fn conflict_requires_values_beyond_tolerance() {
    let merger = FieldMerger::new(MergeConfig::default());

    let within = merger.merge(
        &[
            proposal("Box1_Wages", FieldValue::Number(50000.0), 0.9, SourceLayer::Query),
            proposal("Box1_Wages", FieldValue::Number(50010.0), 0.6, SourceLayer::Regex),
        ],
        DocumentType::W2,
    );
    assert!(!within.fields["Box1_Wages"].conflict);

    let beyond = merger.merge(
        &[
            proposal("Box1_Wages", FieldValue::Number(50000.0), 0.9, SourceLayer::Query),
            proposal("Box1_Wages", FieldValue::Number(5000.0), 0.6, SourceLayer::Regex),
        ],
        DocumentType::W2,
    );
    let wages = &beyond.fields["Box1_Wages"];
    assert!(wages.conflict);
    assert_eq!(wages.alternative_values.len(), 1);
    assert_eq!(wages.alternative_values[0].value, FieldValue::Number(5000.0));

    let single = merger.merge(
        &[proposal("Box1_Wages", FieldValue::Number(1.0), 0.9, SourceLayer::Query)],
        DocumentType::W2,
    );
    assert!(!single.fields["Box1_Wages"].conflict);
}

#[test]
fn conflicts_force_review() {
    let merger = FieldMerger::new(MergeConfig::default());
    let validator = FieldValidator::new(ValidationConfig::default());
    let out = merger.merge(
        &[
            proposal("EmployerEIN", FieldValue::Text("12-3456789".into()), 0.9, SourceLayer::Query),
            proposal("EmployeeSSN", FieldValue::Text("123-45-6789".into()), 0.9, SourceLayer::Query),
            proposal("Box1_Wages", FieldValue::Number(50000.0), 0.9, SourceLayer::Query),
            proposal("Box1_Wages", FieldValue::Number(40000.0), 0.6, SourceLayer::Regex),
            proposal("Box2_FederalTaxWithheld", FieldValue::Number(8500.0), 0.9, SourceLayer::Query),
            proposal("TaxYear", FieldValue::Text("2024".into()), 0.9, SourceLayer::Query),
        ],
        DocumentType::W2,
    );
    let report = validator.validate(&out.fields, DocumentType::W2);
    assert_eq!(report.completeness_score, 1.0);
    assert!(report.errors.is_empty());
    assert!(report.needs_review);
}

// ── Completeness bound ──────────────────────────────────────────────────────

#[test]
fn completeness_stays_within_unit_interval() {
    let validator = FieldValidator::new(ValidationConfig::default());
    let cases = [
        (DocumentType::W2, merged(&[])),
        (DocumentType::W2, merged(&[("Box1_Wages", 1.0), ("Unrelated", 2.0)])),
        (DocumentType::Paystub, merged(&[("GrossPay", 1.0), ("NetPay", 1.0)])),
        (DocumentType::Form1098, merged(&[("Box1_MortgageInterest", 900.0)])),
        (DocumentType::Unknown, merged(&[("Anything", 1.0)])),
    ];
    for (doc_type, fields) in cases {
        let score = validator.validate(&fields, doc_type).completeness_score;
        assert!((0.0..=1.0).contains(&score), "{doc_type}: {score}");
    }
    assert_eq!(
        validator.validate(&merged(&[]), DocumentType::Unknown).completeness_score,
        1.0
    );
}

// ── Withholding audit ───────────────────────────────────────────────────────

#[test]
fn social_security_math_audit() {
    let validator = FieldValidator::new(ValidationConfig::default());

    let passing = merged(&[
        ("Box3_SocialSecurityWages", 50000.0),
        ("Box4_SocialSecurityTaxWithheld", 3100.0),
    ]);
    let report = validator.validate(&passing, DocumentType::W2);
    assert!(report.findings.iter().all(|f| f.severity < Severity::Error));

    let failing = merged(&[
        ("Box3_SocialSecurityWages", 50000.0),
        ("Box4_SocialSecurityTaxWithheld", 2500.0),
    ]);
    let report = validator.validate(&failing, DocumentType::W2);
    let mismatches: Vec<_> = report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert!(mismatches[0].message.contains("3100.00"));
    assert_eq!(report.errors.len(), 1);
    assert!(report.needs_review);
}

// ── Classification cascade ──────────────────────────────────────────────────

#[test]
fn strong_heuristic_never_calls_models() {
    let ml = Arc::new(MockMlClassifier::new("paystub", 0.99));
    let llm = Arc::new(MockLlmClient::new(r#"{"label": "paystub", "confidence": 0.99}"#));
    let ensemble = ClassifierEnsemble::new(ClassifierConfig::default(), 1)
        .with_ml(ml.clone())
        .with_llm(llm.clone());

    let result = ensemble.classify("Form W-2\nWage and Tax Statement\n2024");

    assert_eq!(result.label, DocumentType::W2);
    assert_eq!(result.source, ClassificationSource::Heuristic);
    assert!(result.score >= 0.85);
    assert_eq!(ml.call_count(), 0);
    assert_eq!(llm.call_count(), 0);
    assert_eq!(result.trace.len(), 1);
}

#[test]
fn weak_heuristic_falls_through_to_models() {
    let ml = Arc::new(MockMlClassifier::new("paystub", 0.4));
    let llm = Arc::new(MockLlmClient::new(r#"{"label": "paystub", "confidence": 0.9}"#));
    let ensemble = ClassifierEnsemble::new(ClassifierConfig::default(), 1)
        .with_ml(ml.clone())
        .with_llm(llm.clone());

    let result = ensemble.classify("statement for the period");

    assert_eq!(result.label, DocumentType::Paystub);
    assert_eq!(result.source, ClassificationSource::Llm);
    assert_eq!(ml.call_count(), 1);
    assert_eq!(llm.call_count(), 1);
}

// ── Layer fallback ──────────────────────────────────────────────────────────

#[test]
fn malformed_llm_json_falls_back_to_regex() {
    let analyzer = MockAnalyzer::from_text(&[
        "Form W-2 Wage and Tax Statement",
        "Wages, tips, other compensation $50,000.00",
        "Federal income tax withheld $8,500.00",
    ]);
    let llm = Arc::new(MockLlmClient::new("Sure! The wages look like fifty thousand."));
    let processor = DocumentProcessor::new(
        PipelineConfig::default(),
        Collaborators {
            analyzer: Arc::new(analyzer),
            llm: Some(llm.clone()),
            ml: None,
        },
    );

    let result = processor
        .process(&Document::new(b"%PDF-1.7".to_vec()))
        .completed()
        .cloned()
        .unwrap();

    assert!(result.metadata.degradations.iter().any(|d| matches!(
        d,
        Degradation::ParseFailure { context, .. } if context == "extract.llm"
    )));
    let llm_report = result
        .metadata
        .layers
        .iter()
        .find(|r| r.layer == SourceLayer::Llm)
        .unwrap();
    assert!(matches!(llm_report.status, LayerStatus::Failed { .. }));
    assert_eq!(llm_report.proposals, 0);

    let wages = result.field("Box1_Wages").unwrap();
    assert_eq!(wages.value, FieldValue::Number(50000.0));
    assert_eq!(wages.source, SourceLayer::Regex);
    assert_eq!(llm.call_count(), 1);
}
