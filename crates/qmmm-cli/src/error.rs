use qmmmpp::core::io::system_file::SystemLoadError;
use qmmmpp::core::neighbors::NeighborListError;
use qmmmpp::engine::error::QmmmError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] QmmmError),

    #[error("Failed to load system: {0}")]
    SystemLoad(#[from] SystemLoadError),

    #[error("Neighbor search failed: {0}")]
    Neighbors(#[from] NeighborListError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),
}
