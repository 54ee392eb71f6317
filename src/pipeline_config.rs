//! Pipeline configuration: thresholds, truncation caps, layer confidences,
//! merge tolerances, audit rates, collaborator timeouts and job thresholds.
//!
//! Loaded once at startup (JSON, every field optional) and validated; never
//! mutated afterwards. Per-type keyword/field tables live in `models::catalog`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CONFIG_PATH_ENV;
use crate::models::catalog;
use crate::models::DocumentType;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config JSON is invalid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Classifier ensemble thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Heuristic score at or above which the cascade stops immediately.
    pub heuristic_accept: f32,
    /// ML top-class score at or above which ML is accepted.
    pub ml_accept: f32,
    /// Score reported for `Unknown` when no keyword matched.
    pub unknown_baseline: f32,
    /// Confidence used when the LLM answer cannot be parsed.
    pub llm_parse_fallback: f32,
    /// Upper bound on any heuristic score.
    pub heuristic_cap: f32,
    pub ml_max_chars: usize,
    pub llm_max_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            heuristic_accept: 0.85,
            ml_accept: 0.80,
            unknown_baseline: 0.5,
            llm_parse_fallback: 0.6,
            heuristic_cap: 0.99,
            ml_max_chars: 5_000,
            llm_max_chars: 8_000,
        }
    }
}

/// Template matcher thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Rule score above which the fast path returns immediately.
    pub fast_path_score: f32,
    /// Minimum cosine similarity for the vector path.
    pub similarity_threshold: f32,
    pub similarity_boost: f32,
    pub similarity_cap: f32,
    /// Score above which deterministic extraction is allowed.
    pub deterministic_score: f32,
    /// Confidence above which the LLM is primary rather than the only layer.
    pub llm_primary_confidence: f32,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            fast_path_score: 0.8,
            similarity_threshold: 0.3,
            similarity_boost: 1.2,
            similarity_cap: 0.9,
            deterministic_score: 0.6,
            llm_primary_confidence: 0.2,
        }
    }
}

/// Extraction layer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub strict_json_confidence: f32,
    pub loose_json_confidence: f32,
    pub regex_confidence: f32,
    /// Query answers below this confidence are refilled by the LLM layer.
    pub refill_below: f32,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
    pub llm_max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            strict_json_confidence: 0.88,
            loose_json_confidence: 0.85,
            regex_confidence: 0.6,
            refill_below: 0.6,
            llm_max_tokens: 1024,
            llm_temperature: 0.0,
            llm_max_chars: 12_000,
        }
    }
}

/// Merge tolerances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub numeric_abs_tolerance: f64,
    pub numeric_rel_tolerance: f64,
    /// A conflicting higher-precedence value loses only when it trails by this much.
    pub override_margin: f32,
    /// Added per additional agreeing source.
    pub corroboration_bonus: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            numeric_abs_tolerance: 0.01,
            numeric_rel_tolerance: 0.005,
            override_margin: 0.25,
            corroboration_bonus: 0.05,
        }
    }
}

/// Validation and audit settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Completeness below this forces review.
    pub review_completeness: f32,
    pub social_security_rate: f64,
    pub medicare_rate: f64,
    /// Absolute dollar tolerance for statutory withholding checks.
    pub withholding_tolerance: f64,
    /// Absolute tolerance for gross - deductions = net.
    pub net_pay_tolerance: f64,
    pub social_security_wage_base: f64,
    /// Per-type required-field overrides; types not listed use the catalog.
    pub required_fields: BTreeMap<DocumentType, Vec<String>>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            review_completeness: 0.8,
            social_security_rate: 0.062,
            medicare_rate: 0.0145,
            withholding_tolerance: 1.0,
            net_pay_tolerance: 0.01,
            social_security_wage_base: 168_600.0,
            required_fields: BTreeMap::new(),
        }
    }
}

/// Collaborator endpoints and call policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub timeout_secs: u64,
    /// Retries after the first attempt for retryable errors.
    pub max_retries: u32,
    pub llm_base_url: String,
    pub llm_model: String,
    pub ml_endpoint: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 1,
            llm_base_url: "http://localhost:11434".into(),
            llm_model: "llama3.1:8b".into(),
            ml_endpoint: None,
        }
    }
}

/// When to use job-based (start/poll) analysis instead of immediate analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub async_page_threshold: u32,
    pub async_byte_threshold: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            async_page_threshold: 15,
            async_byte_threshold: 10 * 1024 * 1024,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub classifier: ClassifierConfig,
    pub template: TemplateConfig,
    pub extraction: ExtractionConfig,
    pub merge: MergeConfig,
    pub validation: ValidationConfig,
    pub services: ServiceConfig,
    pub jobs: JobConfig,
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Load from the file named by `FORMSIFT_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => {
                tracing::info!(path = ?path, "Loading pipeline config");
                Self::from_file(Path::new(&path))
            }
            None => Ok(Self::default()),
        }
    }

    /// Range and ordering checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit_values = [
            ("classifier.heuristic_accept", self.classifier.heuristic_accept),
            ("classifier.ml_accept", self.classifier.ml_accept),
            ("classifier.unknown_baseline", self.classifier.unknown_baseline),
            ("classifier.llm_parse_fallback", self.classifier.llm_parse_fallback),
            ("classifier.heuristic_cap", self.classifier.heuristic_cap),
            ("template.fast_path_score", self.template.fast_path_score),
            ("template.similarity_threshold", self.template.similarity_threshold),
            ("template.similarity_cap", self.template.similarity_cap),
            ("template.deterministic_score", self.template.deterministic_score),
            ("template.llm_primary_confidence", self.template.llm_primary_confidence),
            ("extraction.strict_json_confidence", self.extraction.strict_json_confidence),
            ("extraction.loose_json_confidence", self.extraction.loose_json_confidence),
            ("extraction.regex_confidence", self.extraction.regex_confidence),
            ("extraction.refill_below", self.extraction.refill_below),
            ("merge.override_margin", self.merge.override_margin),
            ("merge.corroboration_bonus", self.merge.corroboration_bonus),
            ("validation.review_completeness", self.validation.review_completeness),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if self.extraction.loose_json_confidence > self.extraction.strict_json_confidence {
            return Err(ConfigError::Invalid(
                "extraction.loose_json_confidence must not exceed strict_json_confidence".into(),
            ));
        }
        if self.classifier.heuristic_cap < self.classifier.heuristic_accept {
            return Err(ConfigError::Invalid(
                "classifier.heuristic_cap must not be below heuristic_accept".into(),
            ));
        }
        if self.template.llm_primary_confidence > self.template.deterministic_score {
            return Err(ConfigError::Invalid(
                "template.llm_primary_confidence must not exceed deterministic_score".into(),
            ));
        }
        if self.classifier.ml_max_chars == 0 || self.classifier.llm_max_chars == 0 {
            return Err(ConfigError::Invalid("truncation caps must be positive".into()));
        }
        if self.merge.numeric_abs_tolerance < 0.0 || self.merge.numeric_rel_tolerance < 0.0 {
            return Err(ConfigError::Invalid("merge tolerances must be non-negative".into()));
        }
        if self.services.timeout_secs == 0 {
            return Err(ConfigError::Invalid("services.timeout_secs must be positive".into()));
        }

        for (doc_type, keys) in &self.validation.required_fields {
            let profile = catalog::profile(*doc_type);
            if let Some(unknown) = keys.iter().find(|k| profile.field(k).is_none()) {
                return Err(ConfigError::Invalid(format!(
                    "required field '{unknown}' is not a {doc_type} field"
                )));
            }
        }

        Ok(())
    }

    pub fn required_fields(&self, document_type: DocumentType) -> Vec<&str> {
        self.validation.required_for(document_type)
    }
}

impl ValidationConfig {
    /// Required fields for a type: the override when configured, else the catalog.
    pub fn required_for(&self, document_type: DocumentType) -> Vec<&str> {
        match self.required_fields.get(&document_type) {
            Some(keys) => keys.iter().map(String::as_str).collect(),
            None => catalog::profile(document_type).required.to_vec(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
