//! Lookup service data model
//!
//! Shape of the `GET /nodes` response and the addresses synthesized from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One broker node as reported by a lookup node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub remote_address: String,
    #[serde(default)]
    pub hostname: String,
    pub broadcast_address: String,
    pub tcp_port: u16,
    pub http_port: u16,
    #[serde(default)]
    pub version: String,
}

impl NodeData {
    /// Data-plane address (`broadcast_address:tcp_port`)
    pub fn tcp_address(&self) -> String {
        format!("{}:{}", self.broadcast_address, self.tcp_port)
    }

    /// Admin-plane address (`broadcast_address:http_port`)
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.broadcast_address, self.http_port)
    }

    pub fn address(&self) -> NodeAddress {
        NodeAddress {
            tcp: self.tcp_address(),
            http: self.http_address(),
        }
    }
}

/// `GET /nodes` response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesData {
    #[serde(default)]
    pub producers: Vec<NodeData>,
}

/// Both planes of one discovered broker node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    /// Data-plane `host:port`
    pub tcp: String,
    /// Admin-plane `host:port`
    pub http: String,
}

impl NodeAddress {
    pub fn new(tcp: impl Into<String>, http: impl Into<String>) -> Self {
        Self {
            tcp: tcp.into(),
            http: http.into(),
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (http {})", self.tcp, self.http)
    }
}
