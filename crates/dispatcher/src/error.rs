//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A configured sink could not be opened; the dispatcher is not started
    #[error("sink '{name}' could not be created: {source}")]
    SinkCreation {
        name: String,
        #[source]
        source: ContractError,
    },
}

impl DispatcherError {
    pub fn sink_creation(name: impl Into<String>, source: ContractError) -> Self {
        Self::SinkCreation {
            name: name.into(),
            source,
        }
    }
}
