use crate::models::catalog::TemplateSpec;
use crate::pipeline::classify::heuristic::contains_phrase;

/// Fraction of a template's keyword characters found in the text.
/// Each keyword weighs its own length, so long phrases dominate.
pub fn rule_score(normalized: &str, template: &TemplateSpec) -> f32 {
    let total: usize = template.keywords.iter().map(|k| k.len()).sum();
    if total == 0 {
        return 0.0;
    }
    let matched: usize = template
        .keywords
        .iter()
        .filter(|k| contains_phrase(normalized, k))
        .map(|k| k.len())
        .sum();
    matched as f32 / total as f32
}
