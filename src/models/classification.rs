use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::{ClassificationSource, DocumentType, ExtractionStrategy};
use super::result::Degradation;

/// Outcome of the classifier ensemble. One per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: DocumentType,
    pub score: f32,
    pub source: ClassificationSource,
    /// Score each stage reported, for every stage that ran.
    pub trace: BTreeMap<ClassificationSource, f32>,
    pub degradations: Vec<Degradation>,
}

/// Outcome of the template matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMatch {
    pub template: String,
    pub document_type: DocumentType,
    pub confidence: f32,
    pub strategy: ExtractionStrategy,
}

impl TemplateMatch {
    pub const UNKNOWN_TEMPLATE: &'static str = "Unknown";

    pub fn unknown() -> Self {
        Self {
            template: Self::UNKNOWN_TEMPLATE.to_string(),
            document_type: DocumentType::Unknown,
            confidence: 0.0,
            strategy: ExtractionStrategy::LlmOnly,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.template == Self::UNKNOWN_TEMPLATE
    }
}
