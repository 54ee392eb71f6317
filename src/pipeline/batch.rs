//! Cross-document batch runner. Documents are independent, so each one is
//! processed on tokio's blocking pool, bounded by a semaphore.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::processor::DocumentProcessor;
use super::PipelineError;
use crate::models::{Document, ExtractionOutcome, FailedExtraction, StageName};

/// Default concurrent documents when the caller passes 0.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Process `documents` concurrently. Outcomes come back in input order.
pub async fn process_batch(
    processor: Arc<DocumentProcessor>,
    documents: Vec<Document>,
    max_concurrent: usize,
) -> Vec<ExtractionOutcome> {
    if documents.is_empty() {
        return Vec::new();
    }

    let max_concurrent = if max_concurrent == 0 {
        DEFAULT_CONCURRENCY
    } else {
        max_concurrent
    };
    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let ids: Vec<_> = documents.iter().map(Document::id).collect();

    tracing::info!(documents = documents.len(), max_concurrent, "Starting batch");

    let mut tasks = JoinSet::new();
    for (index, document) in documents.into_iter().enumerate() {
        let processor = Arc::clone(&processor);
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return (index, Err(PipelineError::Worker(e.to_string()))),
            };
            let outcome = tokio::task::spawn_blocking(move || processor.process(&document))
                .await
                .map_err(|e| PipelineError::Worker(e.to_string()));
            (index, outcome)
        });
    }

    let mut outcomes: Vec<Option<ExtractionOutcome>> = vec![None; ids.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(outcome))) => outcomes[index] = Some(outcome),
            Ok((index, Err(e))) => {
                tracing::error!(doc_id = %ids[index], error = %e, "Batch worker failed");
                outcomes[index] = Some(worker_failure(ids[index], &e));
            }
            Err(e) => tracing::error!(error = %e, "Batch task panicked"),
        }
    }

    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, Some(ExtractionOutcome::Completed(_))))
        .count();
    tracing::info!(documents = ids.len(), completed, "Batch finished");

    outcomes
        .into_iter()
        .zip(ids)
        .map(|(outcome, id)| {
            outcome.unwrap_or_else(|| {
                worker_failure(id, &PipelineError::Worker("task did not report".into()))
            })
        })
        .collect()
}

fn worker_failure(document_id: uuid::Uuid, error: &PipelineError) -> ExtractionOutcome {
    ExtractionOutcome::Failed(FailedExtraction {
        document_id,
        stage_reached: StageName::Received,
        reason: error.to_string(),
        degradations: Vec::new(),
        stages: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentType;
    use crate::pipeline::processor::Collaborators;
    use crate::pipeline::services::MockAnalyzer;
    use crate::pipeline_config::PipelineConfig;

    fn processor() -> Arc<DocumentProcessor> {
        Arc::new(DocumentProcessor::new(
            PipelineConfig::default(),
            Collaborators::analyzer_only(Arc::new(MockAnalyzer::new(vec![]))),
        ))
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        assert!(process_batch(processor(), vec![], 2).await.is_empty());
    }

    #[tokio::test]
    async fn outcomes_keep_input_order() {
        let docs = vec![
            Document::from_text("Form W-2 Wage and Tax Statement\nWages, tips, other compensation $1,000.00"),
            Document::new(b"%PDF-1.4 blank scan".to_vec()),
            Document::from_text("Earnings Statement\nGross pay $2,000.00\nNet pay $1,500.00"),
        ];
        let ids: Vec<_> = docs.iter().map(Document::id).collect();

        let outcomes = process_batch(processor(), docs, 2).await;

        assert_eq!(outcomes.len(), 3);
        let out_ids: Vec<_> = outcomes.iter().map(ExtractionOutcome::document_id).collect();
        assert_eq!(out_ids, ids);
        assert_eq!(outcomes[0].completed().unwrap().document_type, DocumentType::W2);
        assert!(outcomes[1].is_failed());
        assert_eq!(outcomes[2].completed().unwrap().document_type, DocumentType::Paystub);
    }

    #[tokio::test]
    async fn zero_concurrency_uses_default() {
        let docs = vec![Document::from_text("Form W-2 Wage and Tax Statement")];
        let outcomes = process_batch(processor(), docs, 0).await;
        assert_eq!(outcomes.len(), 1);
    }
}
