//! Template matcher: picks the closest known layout and the extraction
//! strategy that layout supports.
//!
//! Fast path: keyword rules weighted by phrase length. Slow path: cosine
//! similarity over unigram+bigram TF-IDF vectors. The higher of the two wins.

pub mod rules;
pub mod vector;

use crate::models::catalog::{self, TemplateSpec};
use crate::models::{DocumentType, ExtractionStrategy, TemplateMatch};
use crate::pipeline::classify::heuristic::normalize_text;
use crate::pipeline_config::TemplateConfig;

use vector::TEMPLATE_INDEX;

pub struct TemplateMatcher {
    config: TemplateConfig,
}

impl TemplateMatcher {
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }

    /// Match against the whole template library.
    pub fn match_text(&self, text: &str) -> TemplateMatch {
        self.match_filtered(text, |_| true)
    }

    /// Match only among templates of an already-classified type.
    pub fn match_for_type(&self, text: &str, document_type: DocumentType) -> TemplateMatch {
        self.match_filtered(text, |t| t.document_type == document_type)
    }

    fn match_filtered(&self, text: &str, keep: impl Fn(&TemplateSpec) -> bool) -> TemplateMatch {
        let normalized = normalize_text(text);

        let fast = catalog::templates()
            .iter()
            .filter(|t| keep(*t))
            .map(|t| (t, rules::rule_score(&normalized, t)))
            .fold(None, best_of);

        if let Some((template, score)) = fast {
            if score > self.config.fast_path_score {
                tracing::debug!(template = template.name, score, "Template fast path");
                let strategy = if has_structured_config(template.document_type) {
                    ExtractionStrategy::Deterministic
                } else {
                    ExtractionStrategy::LlmPrimary
                };
                return TemplateMatch {
                    template: template.name.to_string(),
                    document_type: template.document_type,
                    confidence: score,
                    strategy,
                };
            }
        }

        let slow = TEMPLATE_INDEX
            .similarities(&normalized)
            .into_iter()
            .filter(|(t, _)| keep(*t))
            .map(|(t, sim)| (t, sim as f32))
            .fold(None, best_of)
            .filter(|(_, sim)| *sim > self.config.similarity_threshold)
            .map(|(t, sim)| {
                (
                    t,
                    (sim * self.config.similarity_boost).min(self.config.similarity_cap),
                )
            });

        let best = match (fast, slow) {
            (Some(f), Some(s)) => Some(if s.1 > f.1 { s } else { f }),
            (f, s) => f.or(s),
        };

        match best {
            Some((template, confidence)) if confidence > 0.0 => {
                tracing::debug!(template = template.name, confidence, "Template matched");
                TemplateMatch {
                    template: template.name.to_string(),
                    document_type: template.document_type,
                    confidence,
                    strategy: self.select_strategy(template.document_type, confidence),
                }
            }
            _ => TemplateMatch::unknown(),
        }
    }

    /// `deterministic` needs both a confident match and query configuration.
    pub fn select_strategy(&self, document_type: DocumentType, confidence: f32) -> ExtractionStrategy {
        if confidence > self.config.deterministic_score && has_structured_config(document_type) {
            ExtractionStrategy::Deterministic
        } else if confidence > self.config.llm_primary_confidence {
            ExtractionStrategy::LlmPrimary
        } else {
            ExtractionStrategy::LlmOnly
        }
    }
}

fn has_structured_config(document_type: DocumentType) -> bool {
    catalog::profile(document_type).has_structured_config()
}

/// Keeps the first of equal scores.
fn best_of<'a>(
    best: Option<(&'a TemplateSpec, f32)>,
    candidate: (&'a TemplateSpec, f32),
) -> Option<(&'a TemplateSpec, f32)> {
    match best {
        Some(b) if b.1 >= candidate.1 => Some(b),
        _ => Some(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> TemplateMatcher {
        TemplateMatcher::new(TemplateConfig::default())
    }

    #[test]
    fn full_keyword_coverage_takes_fast_path() {
        let text = "Form W-2 Wage and Tax Statement\nWages, tips, other compensation\n\
                    Federal income tax withheld\nSocial security wages\nMedicare wages and tips\n\
                    Employer identification number\nControl number";
        let m = matcher().match_text(text);
        assert_eq!(m.template, "W2 Standard");
        assert_eq!(m.document_type, DocumentType::W2);
        assert_eq!(m.strategy, ExtractionStrategy::Deterministic);
        assert!(m.confidence > 0.8);
    }

    #[test]
    fn fast_path_without_queries_is_llm_primary() {
        let text = "Form 1098 Mortgage Interest Statement\nMortgage interest received\n\
                    Outstanding mortgage principal";
        let m = matcher().match_text(text);
        assert_eq!(m.document_type, DocumentType::Form1098);
        assert_eq!(m.strategy, ExtractionStrategy::LlmPrimary);
    }

    #[test]
    fn partial_text_uses_best_of_both_paths() {
        let m = matcher().match_text("Gusto\nNet pay 1,234.00\nCheck date 02/15/2024");
        assert_eq!(m.template, "Paystub Gusto");
        assert!(m.confidence > 0.2 && m.confidence <= 0.9);
    }

    #[test]
    fn nothing_recognizable_is_unknown() {
        let m = matcher().match_text("quarterly newsletter");
        assert!(m.is_unknown());
        assert_eq!(m.confidence, 0.0);
        assert_eq!(m.strategy, ExtractionStrategy::LlmOnly);
    }

    #[test]
    fn type_filter_restricts_candidates() {
        let m = matcher().match_for_type("Gross pay 100.00 Net pay 80.00", DocumentType::W2);
        assert!(m.is_unknown() || m.document_type == DocumentType::W2);
    }

    #[test]
    fn strategy_thresholds() {
        let m = matcher();
        assert_eq!(m.select_strategy(DocumentType::W2, 0.7), ExtractionStrategy::Deterministic);
        assert_eq!(m.select_strategy(DocumentType::Form1098, 0.7), ExtractionStrategy::LlmPrimary);
        assert_eq!(m.select_strategy(DocumentType::W2, 0.5), ExtractionStrategy::LlmPrimary);
        assert_eq!(m.select_strategy(DocumentType::W2, 0.1), ExtractionStrategy::LlmOnly);
    }
}
