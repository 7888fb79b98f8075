//! Producer pool errors

use contracts::ContractError;
use thiserror::Error;

/// Errors returned by the producer pool
///
/// Configuration problems surface synchronously, before any network call.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// No manager registered under the category
    #[error("category '{category}' is not registered")]
    CategoryNotRegistered { category: String },

    /// The category's pool is empty
    #[error("no producer available for category '{category}'")]
    NoProducerAvailable { category: String },

    /// Discovery returned no admin-plane address
    #[error("no broker nodes discovered for category '{category}'")]
    NoNodesAvailable { category: String },

    /// The client's run loop has exited
    #[error("producer client for '{address}' is stopped")]
    ClientStopped { address: String },

    /// Manager configuration rejected
    #[error("invalid configuration for category '{category}': {message}")]
    InvalidConfig { category: String, message: String },

    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ProducerError {
    pub fn category_not_registered(category: impl Into<String>) -> Self {
        Self::CategoryNotRegistered {
            category: category.into(),
        }
    }

    pub fn no_producer_available(category: impl Into<String>) -> Self {
        Self::NoProducerAvailable {
            category: category.into(),
        }
    }

    pub fn no_nodes_available(category: impl Into<String>) -> Self {
        Self::NoNodesAvailable {
            category: category.into(),
        }
    }

    pub fn client_stopped(address: impl Into<String>) -> Self {
        Self::ClientStopped {
            address: address.into(),
        }
    }

    pub fn invalid_config(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            category: category.into(),
            message: message.into(),
        }
    }
}
