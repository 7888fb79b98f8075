//! Layered error definitions
//!
//! Categorized by source: config / connection / publish / lookup / admin

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Data-plane Errors =====
    /// Broker connection could not be established
    #[error("broker connection error for '{address}': {message}")]
    Connection { address: String, message: String },

    /// Publish rejected or failed in transit
    #[error("publish to '{address}' (topic '{topic}') failed: {message}")]
    Publish {
        address: String,
        topic: String,
        message: String,
    },

    /// Connection already stopped
    #[error("broker connection '{address}' is stopped")]
    ConnectionStopped { address: String },

    // ===== Control-plane Errors =====
    /// Lookup node query failed
    #[error("lookup '{lookup}' failed: {message}")]
    Lookup { lookup: String, message: String },

    /// Administrative request to a broker node failed
    #[error("admin request to '{node}' failed: {message}")]
    Admin { node: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create broker connection error
    pub fn connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create publish error
    pub fn publish(
        address: impl Into<String>,
        topic: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Publish {
            address: address.into(),
            topic: topic.into(),
            message: message.into(),
        }
    }

    /// Create lookup error
    pub fn lookup(lookup: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lookup {
            lookup: lookup.into(),
            message: message.into(),
        }
    }

    /// Create admin error
    pub fn admin(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Admin {
            node: node.into(),
            message: message.into(),
        }
    }
}
