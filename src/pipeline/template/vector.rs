//! TF-IDF vectors over unigrams and bigrams for template similarity.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::models::catalog::{self, TemplateSpec};

pub type SparseVector = HashMap<String, f64>;

/// Index over the template library, built once.
pub struct TemplateIndex {
    idf: HashMap<String, f64>,
    vectors: Vec<(&'static TemplateSpec, SparseVector)>,
}

pub static TEMPLATE_INDEX: LazyLock<TemplateIndex> =
    LazyLock::new(|| TemplateIndex::build(catalog::templates()));

impl TemplateIndex {
    pub fn build(templates: &'static [TemplateSpec]) -> Self {
        let bags: Vec<HashMap<String, usize>> = templates.iter().map(keyword_bag).collect();

        let n = bags.len() as f64;
        let mut df: HashMap<&str, usize> = HashMap::new();
        for bag in &bags {
            for term in bag.keys() {
                *df.entry(term.as_str()).or_default() += 1;
            }
        }
        let idf: HashMap<String, f64> = df
            .into_iter()
            .map(|(term, count)| {
                let weight = ((1.0 + n) / (1.0 + count as f64)).ln() + 1.0;
                (term.to_string(), weight)
            })
            .collect();

        let vectors = templates
            .iter()
            .zip(bags.iter())
            .map(|(template, bag)| (template, weigh(bag, &idf)))
            .collect();

        Self { idf, vectors }
    }

    /// Vector for arbitrary text; terms outside the vocabulary are ignored.
    pub fn vectorize(&self, text: &str) -> SparseVector {
        weigh(&count_terms(&terms(text)), &self.idf)
    }

    /// Cosine similarity of `text` against every template.
    pub fn similarities(&self, text: &str) -> Vec<(&'static TemplateSpec, f64)> {
        let query = self.vectorize(text);
        self.vectors
            .iter()
            .map(|(template, vector)| (*template, cosine(&query, vector)))
            .collect()
    }
}

/// Alphanumeric tokens plus adjacent-token bigrams.
pub fn terms(text: &str) -> Vec<String> {
    let tokens: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut out = tokens.clone();
    out.extend(tokens.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    out
}

/// Bigrams never span two keywords.
fn keyword_bag(template: &TemplateSpec) -> HashMap<String, usize> {
    let all: Vec<String> = template.keywords.iter().flat_map(|k| terms(k)).collect();
    count_terms(&all)
}

fn count_terms(terms: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for term in terms {
        *counts.entry(term.clone()).or_insert(0) += 1;
    }
    counts
}

fn weigh(counts: &HashMap<String, usize>, idf: &HashMap<String, f64>) -> SparseVector {
    counts
        .iter()
        .filter_map(|(term, &tf)| idf.get(term).map(|w| (term.clone(), tf as f64 * w)))
        .collect()
}

pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(term, wa)| b.get(term).map(|wb| wa * wb))
        .sum();
    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
