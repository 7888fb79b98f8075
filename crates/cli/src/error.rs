//! Error types for CLI operations.

use thiserror::Error;

use contracts::ContractError;
use dispatcher::DispatchError;
use producer::ProducerError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or is invalid
    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: ContractError,
    },

    /// Category missing from the configuration
    #[error("Category '{category}' is not configured")]
    UnknownCategory { category: String },

    /// Producer pool error
    #[error(transparent)]
    Producer(#[from] ProducerError),

    /// Lookup / broker error outside the pool
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Request actor stopped before the call ran
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Some broker nodes rejected an admin request
    #[error("{action} failed on {failed} of {attempted} broker nodes")]
    AdminIncomplete {
        action: String,
        failed: usize,
        attempted: usize,
    },

    /// Some publishes were not acknowledged
    #[error("{failed} of {total} messages were not acknowledged")]
    PublishIncomplete { failed: u64, total: u64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_load(path: impl Into<String>, source: ContractError) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            source,
        }
    }

    pub fn unknown_category(category: impl Into<String>) -> Self {
        Self::UnknownCategory {
            category: category.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
