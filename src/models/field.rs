use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{ConfidenceTier, SourceLayer};

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Blank text and non-finite numbers count as absent.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Number(n) => !n.is_finite(),
            Self::Text(s) => s.trim().is_empty(),
            Self::Date(_) => false,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n:.2}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Candidate value for one field produced by one extraction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProposal {
    pub field_key: String,
    pub value: FieldValue,
    pub confidence: f32,
    pub source_layer: SourceLayer,
}

impl FieldProposal {
    /// Confidence is clamped into [0, 1].
    pub fn new(
        field_key: impl Into<String>,
        value: FieldValue,
        confidence: f32,
        source_layer: SourceLayer,
    ) -> Self {
        Self {
            field_key: field_key.into(),
            value,
            confidence: confidence.clamp(0.0, 1.0),
            source_layer,
        }
    }
}

/// A value that lost the merge for a field, kept for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeValue {
    pub value: FieldValue,
    pub source: SourceLayer,
    pub confidence: f32,
}

/// The reconciled, authoritative value for one field of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedField {
    pub field_key: String,
    pub value: FieldValue,
    pub confidence: f32,
    pub confidence_tier: ConfidenceTier,
    pub source: SourceLayer,
    pub conflict: bool,
    pub alternative_values: Vec<AlternativeValue>,
}
