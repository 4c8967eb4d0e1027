use thiserror::Error;

use super::config::ConfigError;
use crate::core::qm::engine::SolverError;

#[derive(Debug, Error)]
pub enum QmmmError {
    #[error("Configuration error: {source}")]
    Configuration {
        #[from]
        source: ConfigError,
    },

    #[error("Inconsistent QM/MM state at step {step}: {message}")]
    InconsistentState { step: u64, message: String },

    #[error("QM solver failed for layer {layer} at step {step}: {source}")]
    Solver {
        layer: usize,
        step: u64,
        source: SolverError,
    },
}

impl QmmmError {
    pub(crate) fn inconsistent(step: u64, message: impl Into<String>) -> Self {
        QmmmError::InconsistentState {
            step,
            message: message.into(),
        }
    }
}
