//! W-2 withholding arithmetic.

use super::{number, DomainAudit, FieldMap};
use crate::models::{AuditFinding, DocumentType, Severity};
use crate::pipeline_config::ValidationConfig;

const AUDIT: &str = "wage_statement";

pub struct WageStatementAudit;

impl WageStatementAudit {
    /// `tax` must equal `rate` × `base` within the configured tolerance.
    fn statutory(
        fields: &FieldMap,
        base_key: &str,
        tax_key: &str,
        rate: f64,
        tolerance: f64,
    ) -> Option<AuditFinding> {
        let base = number(fields, base_key)?;
        let tax = number(fields, tax_key)?;
        let expected = base * rate;
        if (tax - expected).abs() <= tolerance {
            return None;
        }
        Some(
            AuditFinding::new(
                AUDIT,
                Severity::Error,
                &[base_key, tax_key],
                format!(
                    "{tax_key} is {tax:.2}, expected ≈{expected:.2} ({:.2}% of {base_key} {base:.2})",
                    rate * 100.0
                ),
            )
            .with_amounts(expected, tax),
        )
    }
}

impl DomainAudit for WageStatementAudit {
    fn name(&self) -> &'static str {
        AUDIT
    }

    fn applies_to(&self, document_type: DocumentType) -> bool {
        document_type == DocumentType::W2
    }

    fn audit(
        &self,
        fields: &FieldMap,
        _document_type: DocumentType,
        config: &ValidationConfig,
    ) -> Vec<AuditFinding> {
        let mut findings: Vec<AuditFinding> = [
            Self::statutory(
                fields,
                "Box3_SocialSecurityWages",
                "Box4_SocialSecurityTaxWithheld",
                config.social_security_rate,
                config.withholding_tolerance,
            ),
            Self::statutory(
                fields,
                "Box5_MedicareWages",
                "Box6_MedicareTaxWithheld",
                config.medicare_rate,
                config.withholding_tolerance,
            ),
        ]
        .into_iter()
        .flatten()
        .collect();

        if let (Some(wages), Some(withheld)) = (
            number(fields, "Box1_Wages"),
            number(fields, "Box2_FederalTaxWithheld"),
        ) {
            if withheld > wages {
                findings.push(AuditFinding::new(
                    AUDIT,
                    Severity::Warning,
                    &["Box1_Wages", "Box2_FederalTaxWithheld"],
                    format!("Federal tax withheld {withheld:.2} exceeds wages {wages:.2}"),
                ));
            }
        }

        if let Some(ss_wages) = number(fields, "Box3_SocialSecurityWages") {
            if ss_wages > config.social_security_wage_base {
                findings.push(AuditFinding::new(
                    AUDIT,
                    Severity::Warning,
                    &["Box3_SocialSecurityWages"],
                    format!(
                        "Social security wages {ss_wages:.2} exceed the wage base {:.2}",
                        config.social_security_wage_base
                    ),
                ));
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use crate::pipeline::validate::test_support::fields;

    fn run(entries: &[(&str, f64)]) -> Vec<AuditFinding> {
        let entries: Vec<_> = entries
            .iter()
            .map(|(k, v)| (*k, FieldValue::Number(*v)))
            .collect();
        WageStatementAudit.audit(&fields(&entries), DocumentType::W2, &ValidationConfig::default())
    }

    #[test]
    fn matching_social_security_passes() {
        let findings = run(&[
            ("Box3_SocialSecurityWages", 50000.0),
            ("Box4_SocialSecurityTaxWithheld", 3100.0),
        ]);
        assert!(findings.is_empty());
    }

    #[test]
    fn within_a_dollar_passes() {
        let findings = run(&[
            ("Box3_SocialSecurityWages", 50000.0),
            ("Box4_SocialSecurityTaxWithheld", 3100.75),
        ]);
        assert!(findings.is_empty());
    }

    #[test]
    fn mismatch_cites_expected_amount() {
        let findings = run(&[
            ("Box3_SocialSecurityWages", 50000.0),
            ("Box4_SocialSecurityTaxWithheld", 2500.0),
        ]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Error);
        assert!(findings[0].message.contains("3100.00"));
        assert_eq!(findings[0].expected, Some(3100.0));
        assert_eq!(findings[0].actual, Some(2500.0));
    }

    #[test]
    fn medicare_checked_independently() {
        let findings = run(&[
            ("Box5_MedicareWages", 50000.0),
            ("Box6_MedicareTaxWithheld", 900.0),
        ]);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("725.00"));
    }

    #[test]
    fn missing_inputs_skip_the_check() {
        assert!(run(&[("Box4_SocialSecurityTaxWithheld", 2500.0)]).is_empty());
    }

    #[test]
    fn withholding_above_wages_warns() {
        let findings = run(&[("Box1_Wages", 1000.0), ("Box2_FederalTaxWithheld", 5000.0)]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn wages_above_base_warn() {
        let findings = run(&[
            ("Box3_SocialSecurityWages", 200_000.0),
            ("Box4_SocialSecurityTaxWithheld", 12_400.0),
        ]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
    }
}
