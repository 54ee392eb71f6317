use crate::models::catalog::DocumentProfile;
use crate::models::{Document, FieldProposal, SourceLayer};
use crate::pipeline::corpus::normalize_confidence;
use crate::pipeline::services::{
    with_retry, AnalysisFeature, DocumentAnalyzer, ServiceError, StructuredQuery,
};

use super::values::coerce;

/// Queries for every field of the profile that has one. The field key is the alias.
pub fn build_queries(profile: &DocumentProfile) -> Vec<StructuredQuery> {
    profile
        .fields
        .iter()
        .filter_map(|f| {
            f.query.map(|text| StructuredQuery {
                alias: f.key.to_string(),
                text: text.to_string(),
            })
        })
        .collect()
}

/// Ask the analysis service the profile's queries and turn each usable
/// answer into a proposal. Answers for unknown aliases or values that do not
/// coerce to the field's kind are dropped.
pub fn run_query_layer(
    analyzer: &(dyn DocumentAnalyzer + Send + Sync),
    document: &Document,
    profile: &DocumentProfile,
    max_retries: u32,
) -> Result<Vec<FieldProposal>, ServiceError> {
    let queries = build_queries(profile);
    if queries.is_empty() {
        return Ok(Vec::new());
    }

    let features = [AnalysisFeature::Queries { queries }];
    let analysis = with_retry("extract.query", max_retries, || {
        analyzer.analyze(document.bytes(), &features)
    })?;

    let proposals = analysis
        .query_answers
        .iter()
        .filter_map(|answer| {
            let spec = profile.field(&answer.alias)?;
            let value = coerce(spec.kind(), &answer.text)?;
            Some(FieldProposal::new(
                spec.key,
                value,
                normalize_confidence(answer.confidence),
                SourceLayer::Query,
            ))
        })
        .collect();

    Ok(proposals)
}
