use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MediaCategory;

/// An ingested document. Immutable once built.
#[derive(Debug, Clone)]
pub struct Document {
    id: Uuid,
    bytes: Vec<u8>,
    media: MediaCategory,
    page_count: Option<u32>,
}

impl Document {
    /// Build a document, sniffing its media category from the payload.
    pub fn new(bytes: Vec<u8>) -> Self {
        let media = MediaCategory::sniff(&bytes);
        Self::with_media(bytes, media)
    }

    /// Build a document with a declared media category.
    pub fn with_media(bytes: Vec<u8>, media: MediaCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes,
            media,
            page_count: None,
        }
    }

    /// Plain-text document, mostly useful for tests and text-only sources.
    pub fn from_text(text: &str) -> Self {
        Self::with_media(text.as_bytes().to_vec(), MediaCategory::PlainText)
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_page_count(mut self, pages: u32) -> Self {
        self.page_count = Some(pages);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media(&self) -> MediaCategory {
        self.media
    }

    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Bounding box for a recognized line, in page pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub confidence: f32,
    pub bounding_box: Option<BoundingBox>,
}

impl TextLine {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounding_box: None,
        }
    }
}

/// Ordered recognized lines for one document. Derived once, read-only thereafter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextCorpus {
    lines: Vec<TextLine>,
}

impl TextCorpus {
    pub fn new(lines: Vec<TextLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.text.trim().is_empty())
    }

    /// Lines joined with newlines.
    pub fn full_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Mean line confidence weighted by text length.
    pub fn mean_confidence(&self) -> f32 {
        let total_chars: usize = self.lines.iter().map(|l| l.text.len()).sum();
        if total_chars == 0 {
            return 0.0;
        }
        let weighted: f32 = self
            .lines
            .iter()
            .map(|l| l.confidence * l.text.len() as f32)
            .sum();
        weighted / total_chars as f32
    }
}
