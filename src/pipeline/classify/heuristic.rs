//! Keyword heuristic: the first and cheapest classification stage.

use crate::models::catalog::{self, DocumentProfile};
use crate::models::{ClassificationSource, DocumentType};
use crate::pipeline_config::ClassifierConfig;

use super::Verdict;

/// Lowercase, straighten curly apostrophes, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' => '\'',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when `phrase` occurs in `haystack` bounded by non-alphanumerics.
/// Both sides are expected to be normalized already.
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    find_phrase(haystack, phrase).is_some()
}

/// Byte offset of the first word-bounded occurrence of `phrase`.
pub fn find_phrase(haystack: &str, phrase: &str) -> Option<usize> {
    phrase_positions(haystack, phrase).next()
}

/// Byte offsets of every word-bounded occurrence of `phrase`, left to right.
pub fn phrase_positions<'a>(haystack: &'a str, phrase: &'a str) -> impl Iterator<Item = usize> + 'a {
    haystack
        .match_indices(phrase)
        .map(|(start, _)| start)
        .filter(move |&start| {
            if phrase.is_empty() {
                return false;
            }
            let end = start + phrase.len();
            let before_ok = haystack[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric());
            let after_ok = haystack[end..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric());
            before_ok && after_ok
        })
}

/// Longer phrases are stronger evidence.
pub fn keyword_weight(keyword: &str) -> usize {
    keyword.split_whitespace().count()
}

/// Weighted keyword hits for one profile, normalized by its keyword count.
pub fn score_profile(normalized: &str, profile: &DocumentProfile, cap: f32) -> f32 {
    if profile.keywords.is_empty() {
        return 0.0;
    }
    let hits: usize = profile
        .keywords
        .iter()
        .filter(|kw| contains_phrase(normalized, kw))
        .map(|kw| keyword_weight(kw))
        .sum();
    (hits as f32 / profile.keywords.len() as f32).min(cap)
}

/// Best-scoring label. Ties go to the earlier type; no evidence at all is
/// `Unknown` at the configured baseline.
pub fn classify_heuristic(text: &str, config: &ClassifierConfig) -> Verdict {
    let normalized = normalize_text(text);

    let mut best: Option<(DocumentType, f32)> = None;
    for doc_type in DocumentType::known() {
        let score = score_profile(&normalized, catalog::profile(doc_type), config.heuristic_cap);
        tracing::debug!(label = %doc_type, score, "Heuristic label score");
        if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((doc_type, score));
        }
    }

    match best {
        Some((label, score)) => Verdict {
            label,
            score,
            source: ClassificationSource::Heuristic,
        },
        None => Verdict {
            label: DocumentType::Unknown,
            score: config.unknown_baseline,
            source: ClassificationSource::Heuristic,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn normalizes_case_space_and_quotes() {
        assert_eq!(
            normalize_text("Employer\u{2019}s   NAME\n Form W-2"),
            "employer's name form w-2"
        );
    }

    #[test]
    fn phrase_needs_word_boundaries() {
        assert!(contains_phrase("form w-2 wage", "w-2"));
        assert!(!contains_phrase("parents and others", "rents"));
        assert!(contains_phrase("rents: 1,200.00", "rents"));
        assert!(!contains_phrase("anything", ""));
    }

    #[test]
    fn phrase_positions_skips_unbounded_hits() {
        let found: Vec<usize> = phrase_positions("pay 1 repay 2 pay", "pay").collect();
        assert_eq!(found, vec![0, 14]);
        assert_eq!(phrase_positions("abc", "").count(), 0);
    }

    #[test]
    fn w2_title_lines_score_high() {
        let v = classify_heuristic("Form W-2\nWage and Tax Statement 2024", &config());
        assert_eq!(v.label, DocumentType::W2);
        assert!(v.score >= 0.85, "Expected >= 0.85, got {}", v.score);
    }

    #[test]
    fn score_is_capped() {
        let text = "Form W-2 Wage and Tax Statement\nWages, tips, other compensation\n\
                    Federal income tax withheld\nSocial security wages\nMedicare wages and tips\n\
                    Employer identification number";
        let v = classify_heuristic(text, &config());
        assert_eq!(v.label, DocumentType::W2);
        assert!((v.score - 0.99).abs() < 1e-6);
    }

    #[test]
    fn paystub_keywords_pick_paystub() {
        let v = classify_heuristic("EARNINGS STATEMENT\nPay period: 01/01 - 01/15\nNet pay 1,000.00", &config());
        assert_eq!(v.label, DocumentType::Paystub);
    }

    #[test]
    fn no_evidence_is_unknown_baseline() {
        let v = classify_heuristic("grocery receipt\nbananas 1.99", &config());
        assert_eq!(v.label, DocumentType::Unknown);
        assert_eq!(v.score, 0.5);
        assert_eq!(v.source, ClassificationSource::Heuristic);
    }
}
