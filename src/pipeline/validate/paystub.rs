//! Pay statement reconciliation: net pay arithmetic and period dates.

use super::{date, number, DomainAudit, FieldMap};
use crate::models::{AuditFinding, DocumentType, Severity};
use crate::pipeline_config::ValidationConfig;

const AUDIT: &str = "pay_statement";

pub struct PayStatementAudit;

impl DomainAudit for PayStatementAudit {
    fn name(&self) -> &'static str {
        AUDIT
    }

    fn applies_to(&self, document_type: DocumentType) -> bool {
        document_type == DocumentType::Paystub
    }

    fn audit(
        &self,
        fields: &FieldMap,
        _document_type: DocumentType,
        config: &ValidationConfig,
    ) -> Vec<AuditFinding> {
        let mut findings = Vec::new();

        if let (Some(gross), Some(deductions), Some(net)) = (
            number(fields, "GrossPay"),
            number(fields, "TotalDeductions"),
            number(fields, "NetPay"),
        ) {
            let expected = gross - deductions;
            // Small epsilon so cent-level float noise never trips the check.
            if (net - expected).abs() > config.net_pay_tolerance + 1e-9 {
                findings.push(
                    AuditFinding::new(
                        AUDIT,
                        Severity::Error,
                        &["GrossPay", "TotalDeductions", "NetPay"],
                        format!(
                            "NetPay is {net:.2}, expected ≈{expected:.2} (gross {gross:.2} - deductions {deductions:.2})"
                        ),
                    )
                    .with_amounts(expected, net),
                );
            }
        }

        let start = date(fields, "PayPeriodStart");
        let end = date(fields, "PayPeriodEnd");
        let pay_date = date(fields, "PayDate");

        if let (Some(start), Some(end)) = (start, end) {
            if start >= end {
                findings.push(AuditFinding::new(
                    AUDIT,
                    Severity::Error,
                    &["PayPeriodStart", "PayPeriodEnd"],
                    format!("Pay period start {start} is not before end {end}"),
                ));
            }
        }
        if let (Some(end), Some(pay_date)) = (end, pay_date) {
            if end > pay_date {
                findings.push(AuditFinding::new(
                    AUDIT,
                    Severity::Error,
                    &["PayPeriodEnd", "PayDate"],
                    format!("Pay period end {end} is after pay date {pay_date}"),
                ));
            }
        }

        if let (Some(gross), Some(ytd)) = (number(fields, "GrossPay"), number(fields, "YtdGrossPay")) {
            if ytd < gross {
                findings.push(AuditFinding::new(
                    AUDIT,
                    Severity::Warning,
                    &["GrossPay", "YtdGrossPay"],
                    format!("Year-to-date gross {ytd:.2} is below current gross {gross:.2}"),
                ));
            }
        }

        findings
    }
}
