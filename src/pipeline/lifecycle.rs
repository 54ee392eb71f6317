//! Per-document stage machine:
//! Received → Classified → Extracting(layer)* → Merged → Validated → Completed | Failed.
//!
//! Failed is reachable from Received (no readable text) and from Validated
//! (fatal post-merge finding). Nothing leaves a terminal stage.

use chrono::Utc;

use super::PipelineError;
use crate::models::{SourceLayer, StageName, StageRecord};

#[derive(Debug, Clone)]
pub struct Lifecycle {
    current: StageName,
    history: Vec<StageRecord>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            current: StageName::Received,
            history: vec![StageRecord {
                stage: StageName::Received,
                layer: None,
                at: Utc::now(),
            }],
        }
    }

    pub fn current(&self) -> StageName {
        self.current
    }

    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.current, StageName::Completed | StageName::Failed)
    }

    /// Whether `from → to` is a legal edge.
    pub fn allows(from: StageName, to: StageName) -> bool {
        use StageName::*;
        matches!(
            (from, to),
            (Received, Classified)
                | (Received, Failed)
                | (Classified, Extracting)
                | (Classified, Merged)
                | (Extracting, Extracting)
                | (Extracting, Merged)
                | (Merged, Validated)
                | (Validated, Completed)
                | (Validated, Failed)
        )
    }

    pub fn advance(&mut self, to: StageName) -> Result<(), PipelineError> {
        self.transition(to, None)
    }

    /// Enter `Extracting` for one layer.
    pub fn extracting(&mut self, layer: SourceLayer) -> Result<(), PipelineError> {
        self.transition(StageName::Extracting, Some(layer))
    }

    fn transition(&mut self, to: StageName, layer: Option<SourceLayer>) -> Result<(), PipelineError> {
        if !Self::allows(self.current, to) {
            return Err(PipelineError::InvalidTransition {
                from: self.current,
                to,
            });
        }
        tracing::debug!(from = %self.current, to = %to, layer = ?layer, "Stage transition");
        self.current = to;
        self.history.push(StageRecord {
            stage: to,
            layer,
            at: Utc::now(),
        });
        Ok(())
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
