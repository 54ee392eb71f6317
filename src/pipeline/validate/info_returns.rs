//! 1099 family: withheld federal tax cannot exceed the reported income.

use super::{number, DomainAudit, FieldMap};
use crate::models::{AuditFinding, DocumentType, Severity};
use crate::pipeline_config::ValidationConfig;

const AUDIT: &str = "information_return";
const WITHHELD: &str = "Box4_FederalTaxWithheld";

pub struct InformationReturnAudit;

fn income_keys(document_type: DocumentType) -> &'static [&'static str] {
    match document_type {
        DocumentType::Form1099Nec => &["Box1_NonemployeeCompensation"],
        DocumentType::Form1099Int => &["Box1_InterestIncome"],
        DocumentType::Form1099Div => &["Box1a_TotalOrdinaryDividends"],
        DocumentType::Form1099Misc => &["Box1_RentAmount", "Box2_RoyaltyAmount", "Box3_OtherIncome"],
        _ => &[],
    }
}

impl DomainAudit for InformationReturnAudit {
    fn name(&self) -> &'static str {
        AUDIT
    }

    fn applies_to(&self, document_type: DocumentType) -> bool {
        !income_keys(document_type).is_empty()
    }

    fn audit(
        &self,
        fields: &FieldMap,
        document_type: DocumentType,
        _config: &ValidationConfig,
    ) -> Vec<AuditFinding> {
        let Some(withheld) = number(fields, WITHHELD) else {
            return Vec::new();
        };
        let keys = income_keys(document_type);
        let amounts: Vec<f64> = keys.iter().filter_map(|k| number(fields, k)).collect();
        if amounts.is_empty() {
            return Vec::new();
        }

        let income: f64 = amounts.iter().sum();
        if withheld <= income + 0.01 {
            return Vec::new();
        }

        let mut cited = keys.to_vec();
        cited.push(WITHHELD);
        vec![AuditFinding::new(
            AUDIT,
            Severity::Error,
            &cited,
            format!("Federal tax withheld {withheld:.2} exceeds reported income {income:.2}"),
        )
        .with_amounts(income, withheld)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use crate::pipeline::validate::test_support::fields;

    fn run(doc_type: DocumentType, entries: &[(&str, f64)]) -> Vec<AuditFinding> {
        let entries: Vec<_> = entries
            .iter()
            .map(|(k, v)| (*k, FieldValue::Number(*v)))
            .collect();
        InformationReturnAudit.audit(&fields(&entries), doc_type, &ValidationConfig::default())
    }

    #[test]
    fn applies_only_to_1099s() {
        assert!(InformationReturnAudit.applies_to(DocumentType::Form1099Nec));
        assert!(InformationReturnAudit.applies_to(DocumentType::Form1099Misc));
        assert!(!InformationReturnAudit.applies_to(DocumentType::W2));
        assert!(!InformationReturnAudit.applies_to(DocumentType::Form1098));
    }

    #[test]
    fn plausible_withholding_passes() {
        let findings = run(
            DocumentType::Form1099Nec,
            &[("Box1_NonemployeeCompensation", 12000.0), (WITHHELD, 2400.0)],
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn withholding_above_income_is_error() {
        let findings = run(
            DocumentType::Form1099Int,
            &[("Box1_InterestIncome", 120.0), (WITHHELD, 300.0)],
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].expected, Some(120.0));
    }

    #[test]
    fn misc_sums_income_boxes() {
        let findings = run(
            DocumentType::Form1099Misc,
            &[("Box1_RentAmount", 500.0), ("Box3_OtherIncome", 700.0), (WITHHELD, 1000.0)],
        );
        assert!(findings.is_empty());
    }
}
