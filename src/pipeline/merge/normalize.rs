//! Value normalization and the conflict rule.

use crate::models::{FieldKind, FieldValue};
use crate::pipeline_config::MergeConfig;

/// Comparable text form of a value. Identifiers and years keep only
/// alphanumerics; free text is lowercased with whitespace collapsed.
pub fn canonical_text(kind: FieldKind, value: &FieldValue) -> String {
    let raw = value.to_string();
    if kind.is_identifier() || kind == FieldKind::Year {
        raw.chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect()
    } else {
        raw.to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// True when two values differ beyond tolerance.
/// Numbers: |a − b| > max(abs, rel × max(|a|, |b|)). Dates: exact.
/// Text: canonical forms differ.
pub fn values_conflict(
    kind: FieldKind,
    a: &FieldValue,
    b: &FieldValue,
    config: &MergeConfig,
) -> bool {
    match (a, b) {
        (FieldValue::Number(x), FieldValue::Number(y)) => {
            let tolerance = config
                .numeric_abs_tolerance
                .max(config.numeric_rel_tolerance * x.abs().max(y.abs()));
            (x - y).abs() > tolerance
        }
        (FieldValue::Date(x), FieldValue::Date(y)) => x != y,
        _ => canonical_text(kind, a) != canonical_text(kind, b),
    }
}
