//! Generative extraction: one prompt naming exactly the target keys, one
//! JSON object back.

use serde_json::{Map, Value};

use crate::models::catalog::FieldSpec;
use crate::models::{DocumentType, FieldProposal, SourceLayer};
use crate::pipeline::services::{truncate_chars, with_retry, LlmClient};
use crate::pipeline_config::ExtractionConfig;

use super::values::coerce_json;
use super::ExtractionError;

/// How the JSON object was recovered from the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRecovery {
    /// The whole response parsed as an object.
    Strict,
    /// Only the span from the first `{` to the last `}` parsed.
    Loose,
}

pub fn build_extraction_prompt(
    document_type: DocumentType,
    targets: &[&FieldSpec],
    text: &str,
) -> String {
    let keys = targets
        .iter()
        .map(|f| format!("- {} ({})", f.key, f.kind()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are extracting fields from a {name}.\n\
         Return a single JSON object with exactly these keys:\n{keys}\n\
         Use numbers for amounts (no currency symbols), YYYY-MM-DD for dates, and \
         null for any value not present in the document. Do not add other keys.\n\n\
         Document text:\n{text}",
        name = document_type.display_name(),
    )
}

/// Recover a JSON object: strict whole-response parse first, then the
/// first-`{`-to-last-`}` span.
pub fn parse_json_object(response: &str) -> Result<(Map<String, Value>, JsonRecovery), String> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(response.trim()) {
        return Ok((map, JsonRecovery::Strict));
    }

    let start = response.find('{').ok_or("no JSON object in response")?;
    let end = response.rfind('}').ok_or("no JSON object in response")?;
    if end < start {
        return Err("no JSON object in response".into());
    }

    match serde_json::from_str::<Value>(&response[start..=end]) {
        Ok(Value::Object(map)) => Ok((map, JsonRecovery::Loose)),
        Ok(_) => Err("response JSON is not an object".into()),
        Err(e) => Err(format!("invalid JSON: {e}")),
    }
}

/// Proposals for the target keys present in the object. Unknown keys and
/// nulls are ignored.
pub fn proposals_from_object(
    object: &Map<String, Value>,
    targets: &[&FieldSpec],
    confidence: f32,
) -> Vec<FieldProposal> {
    targets
        .iter()
        .filter_map(|spec| {
            let value = coerce_json(spec.kind(), object.get(spec.key)?)?;
            Some(FieldProposal::new(spec.key, value, confidence, SourceLayer::Llm))
        })
        .collect()
}

pub fn run_llm_layer(
    llm: &(dyn LlmClient + Send + Sync),
    document_type: DocumentType,
    targets: &[&FieldSpec],
    text: &str,
    config: &ExtractionConfig,
    max_retries: u32,
) -> Result<Vec<FieldProposal>, ExtractionError> {
    let prompt = build_extraction_prompt(
        document_type,
        targets,
        truncate_chars(text, config.llm_max_chars),
    );
    let response = with_retry("extract.llm", max_retries, || {
        llm.complete(&prompt, config.llm_max_tokens, config.llm_temperature)
    })?;

    let (object, recovery) = parse_json_object(&response).map_err(ExtractionError::Parse)?;
    let confidence = match recovery {
        JsonRecovery::Strict => config.strict_json_confidence,
        JsonRecovery::Loose => config.loose_json_confidence,
    };
    Ok(proposals_from_object(&object, targets, confidence))
}
