pub mod assemble;
pub mod batch;
pub mod classify;
pub mod corpus;
pub mod extract;
pub mod lifecycle;
pub mod merge;
pub mod processor; // Drives one document through the lifecycle
pub mod services;
pub mod template;
pub mod validate;

use thiserror::Error;

use crate::models::StageName;
use crate::pipeline_config::ConfigError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No readable text could be recovered: {0}")]
    OcrFailure(String),

    #[error("Illegal lifecycle transition from {from} to {to}")]
    InvalidTransition { from: StageName, to: StageName },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Batch worker failed: {0}")]
    Worker(String),
}
