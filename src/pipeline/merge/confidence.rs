use crate::models::{ConfidenceTier, MergedField};

/// Tier cut-offs for merged field confidence.
pub mod thresholds {
    /// At or above this: high confidence.
    pub const HIGH: f32 = 0.90;

    /// At or above this: medium confidence. Below: low.
    pub const MEDIUM: f32 = 0.60;
}

pub fn tier_for(confidence: f32) -> ConfidenceTier {
    if confidence >= thresholds::HIGH {
        ConfidenceTier::High
    } else if confidence >= thresholds::MEDIUM {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    }
}

/// Mean merged-field confidence; 0.0 when nothing was extracted.
pub fn overall_confidence<'a>(fields: impl IntoIterator<Item = &'a MergedField>) -> f32 {
    let (sum, count) = fields
        .into_iter()
        .fold((0.0f32, 0usize), |(sum, n), f| (sum + f.confidence, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}
