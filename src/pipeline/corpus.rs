//! TextCorpusAdapter: turns a document into an ordered list of recognized
//! lines. Plain-text payloads are decoded locally; PDFs and images go
//! through the analysis service.

use super::services::{with_retry, Analysis, AnalysisFeature, DocumentAnalyzer};
use super::PipelineError;
use crate::models::{Document, MediaCategory, TextCorpus, TextLine};

/// Confidence assigned to lines of a born-digital text payload.
const PLAIN_TEXT_CONFIDENCE: f32 = 1.0;

pub struct TextCorpusAdapter<'a> {
    analyzer: &'a (dyn DocumentAnalyzer + Send + Sync),
    max_retries: u32,
}

impl<'a> TextCorpusAdapter<'a> {
    pub fn new(analyzer: &'a (dyn DocumentAnalyzer + Send + Sync), max_retries: u32) -> Self {
        Self {
            analyzer,
            max_retries,
        }
    }

    /// Recover the text corpus. An empty corpus is an `OcrFailure`.
    pub fn corpus_for(&self, document: &Document) -> Result<TextCorpus, PipelineError> {
        let corpus = match document.media() {
            MediaCategory::PlainText => {
                let text = String::from_utf8_lossy(document.bytes());
                from_plain_text(&text)
            }
            MediaCategory::Pdf | MediaCategory::Image => {
                let analysis = with_retry("analyze.text", self.max_retries, || {
                    self.analyzer.analyze(document.bytes(), &[AnalysisFeature::Text])
                })
                .map_err(|e| PipelineError::OcrFailure(e.to_string()))?;
                from_analysis(&analysis)
            }
        };

        if corpus.is_empty() {
            return Err(PipelineError::OcrFailure(
                "analysis returned no readable lines".into(),
            ));
        }
        Ok(corpus)
    }
}

/// Corpus from an analysis response: lines sanitized, blank lines dropped,
/// confidences clamped into [0, 1].
pub fn from_analysis(analysis: &Analysis) -> TextCorpus {
    let lines = analysis
        .lines
        .iter()
        .filter_map(|line| {
            let text = sanitize_line(&line.text);
            if text.is_empty() {
                return None;
            }
            Some(TextLine {
                text,
                confidence: normalize_confidence(line.confidence),
                bounding_box: line.bounding_box.clone(),
            })
        })
        .collect();
    TextCorpus::new(lines)
}

pub fn from_plain_text(text: &str) -> TextCorpus {
    let lines = text
        .lines()
        .map(sanitize_line)
        .filter(|l| !l.is_empty())
        .map(|l| TextLine::new(l, PLAIN_TEXT_CONFIDENCE))
        .collect();
    TextCorpus::new(lines)
}

/// Services report either [0, 1] or [0, 100].
pub fn normalize_confidence(raw: f32) -> f32 {
    if !raw.is_finite() {
        return 0.0;
    }
    let scaled = if raw > 1.0 { raw / 100.0 } else { raw };
    scaled.clamp(0.0, 1.0)
}

/// Strip control characters and collapse runs of whitespace.
/// Keeps the punctuation tax forms rely on (`$`, `,`, `.`, `-`, `/`, `'`, parentheses).
pub fn sanitize_line(raw: &str) -> String {
    raw.chars()
        .filter(|c| {
            c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(
                    c,
                    '.' | ','
                        | ';'
                        | ':'
                        | '-'
                        | '/'
                        | '('
                        | ')'
                        | '['
                        | ']'
                        | '+'
                        | '='
                        | '%'
                        | '#'
                        | '@'
                        | '&'
                        | '$'
                        | '\''
                        | '"'
                        | '!'
                        | '?'
                        | '*'
                        | '_'
                        | '\u{2019}'
                        | '\u{2018}'
                )
        })
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' => '\'',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
