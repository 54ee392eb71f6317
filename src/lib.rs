pub mod config;
pub mod models;
pub mod pipeline;
pub mod pipeline_config; // Thresholds, tolerances, service endpoints

pub use models::{Document, ExtractionOutcome, ExtractionResult};
pub use pipeline::processor::{Collaborators, DocumentProcessor};
pub use pipeline_config::PipelineConfig;

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// [`config::default_log_filter`]. A no-op when a subscriber is already set.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} v{} tracing initialized", config::APP_NAME, config::APP_VERSION);
    }
}
