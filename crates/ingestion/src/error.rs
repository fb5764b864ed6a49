//! Ingestion error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Scenario file could not be read
    #[error("failed to read scenario {path}: {source}")]
    ScenarioRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every record of the scenario was rejected
    #[error("scenario {path} contains no usable records ({errors} rejected)")]
    EmptyScenario { path: PathBuf, errors: usize },

    /// Record-level contract violation
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Channel closed
    #[error("channel closed for source {source_id}")]
    ChannelClosed { source_id: String },

    /// Source is already listening
    #[error("source {source_id} is already listening")]
    AlreadyListening { source_id: String },
}

/// Ingestion Result type alias
pub type Result<T> = std::result::Result<T, IngestionError>;
