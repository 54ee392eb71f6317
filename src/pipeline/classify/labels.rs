use std::str::FromStr;

use crate::models::DocumentType;

/// Alias table keyed by the label squashed to lowercase alphanumerics.
const ALIASES: &[(&str, DocumentType)] = &[
    ("w2", DocumentType::W2),
    ("formw2", DocumentType::W2),
    ("wageandtaxstatement", DocumentType::W2),
    ("wagestatement", DocumentType::W2),
    ("paystub", DocumentType::Paystub),
    ("paystatement", DocumentType::Paystub),
    ("payslip", DocumentType::Paystub),
    ("earningsstatement", DocumentType::Paystub),
    ("1099nec", DocumentType::Form1099Nec),
    ("form1099nec", DocumentType::Form1099Nec),
    ("nonemployeecompensation", DocumentType::Form1099Nec),
    ("1099int", DocumentType::Form1099Int),
    ("form1099int", DocumentType::Form1099Int),
    ("1099misc", DocumentType::Form1099Misc),
    ("form1099misc", DocumentType::Form1099Misc),
    ("1099div", DocumentType::Form1099Div),
    ("form1099div", DocumentType::Form1099Div),
    ("1098", DocumentType::Form1098),
    ("form1098", DocumentType::Form1098),
    ("mortgageintereststatement", DocumentType::Form1098),
    ("unknown", DocumentType::Unknown),
    ("other", DocumentType::Unknown),
];

/// Parse a model-produced label: canonical names first, then aliases.
pub fn parse_label(raw: &str) -> Option<DocumentType> {
    let trimmed = raw.trim().trim_matches('"').to_lowercase();
    if let Ok(doc_type) = DocumentType::from_str(&trimmed) {
        return Some(doc_type);
    }

    let squashed: String = trimmed.chars().filter(|c| c.is_alphanumeric()).collect();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == squashed)
        .map(|(_, doc_type)| *doc_type)
}

/// Closed label set offered to the LLM, comma separated.
pub fn label_list() -> String {
    DocumentType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
