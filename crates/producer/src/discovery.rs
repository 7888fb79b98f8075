//! Broker node discovery through lookup nodes
//!
//! Every lookup answers `GET http://{lookup}/nodes`. A lookup that fails
//! contributes no nodes; the failure is recorded in the report and discovery
//! carries on with the remaining lookups.

use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use contracts::{ContractError, NodeAddress, NodesData};

/// One lookup that could not be queried
#[derive(Debug)]
pub struct LookupFailure {
    pub lookup: String,
    pub error: ContractError,
}

/// Outcome of one discovery pass
///
/// Nodes are listed in lookup order. The same node reported by two lookups
/// appears twice unless discovery was asked to dedupe.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    pub nodes: Vec<NodeAddress>,
    pub failures: Vec<LookupFailure>,
}

impl DiscoveryReport {
    /// At least one lookup failed
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Data-plane addresses
    pub fn tcp_addrs(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.tcp.clone()).collect()
    }

    /// Admin-plane addresses
    pub fn http_addrs(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.http.clone()).collect()
    }
}

/// Build the HTTP client shared by discovery and admin requests
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ContractError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
        .map_err(|e| ContractError::Other(format!("failed to build http client: {e}")))
}

/// Queries lookup nodes for the current broker topology
#[derive(Debug, Clone)]
pub struct LookupClient {
    http: reqwest::Client,
}

impl LookupClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, ContractError> {
        Ok(Self::with_client(http_client(timeout)?))
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Query one lookup node
    ///
    /// # Errors
    /// Transport, status, read and decode failures all map to `ContractError::Lookup`
    pub async fn query(&self, lookup: &str) -> Result<NodesData, ContractError> {
        let url = format!("http://{lookup}/nodes");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ContractError::lookup(lookup, e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| ContractError::lookup(lookup, format!("read body: {e}")))?;

        serde_json::from_slice::<NodesData>(&body)
            .map_err(|e| ContractError::lookup(lookup, format!("decode body: {e}")))
    }

    /// Query every lookup and aggregate the reported nodes
    #[instrument(name = "lookup_discover", skip(self, lookups), fields(lookups = lookups.len()))]
    pub async fn discover(&self, lookups: &[String], dedupe: bool) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let mut seen = HashSet::new();

        for lookup in lookups {
            match self.query(lookup).await {
                Ok(data) => {
                    debug!(lookup = %lookup, producers = data.producers.len(), "Lookup answered");
                    for node in data.producers.iter().map(|p| p.address()) {
                        if dedupe && !seen.insert(node.tcp.clone()) {
                            continue;
                        }
                        report.nodes.push(node);
                    }
                }
                Err(error) => {
                    warn!(lookup = %lookup, error = %error, "Lookup query failed");
                    report.failures.push(LookupFailure {
                        lookup: lookup.clone(),
                        error,
                    });
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fake_lookup, unreachable_addr, FakeNode};

    #[tokio::test]
    async fn test_discover_concatenates_lookups() {
        let first = fake_lookup(vec![
            FakeNode::new("a", 4150, 4151),
            FakeNode::new("b", 4150, 4151),
        ])
        .await;
        let second = fake_lookup(vec![FakeNode::new("a", 4150, 4151)]).await;
        let client = LookupClient::new(Duration::from_secs(2)).unwrap();

        let report = client.discover(&[first.clone(), second.clone()], false).await;
        assert!(!report.is_degraded());
        assert_eq!(report.tcp_addrs(), vec!["a:4150", "b:4150", "a:4150"]);
        assert_eq!(report.http_addrs()[1], "b:4151");

        let deduped = client.discover(&[first, second], true).await;
        assert_eq!(deduped.tcp_addrs(), vec!["a:4150", "b:4150"]);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_recorded_not_fatal() {
        let live = fake_lookup(vec![FakeNode::new("a", 4150, 4151)]).await;
        let dead = unreachable_addr().await;
        let client = LookupClient::new(Duration::from_secs(2)).unwrap();

        let report = client.discover(&[dead.clone(), live], false).await;
        assert_eq!(report.tcp_addrs(), vec!["a:4150"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].lookup, dead);
        assert!(matches!(report.failures[0].error, ContractError::Lookup { .. }));
    }

    #[tokio::test]
    async fn test_undecodable_response_is_a_failure() {
        let addr = crate::test_support::serve(axum::Router::new().route(
            "/nodes",
            axum::routing::get(|| async { "not json" }),
        ))
        .await;
        let client = LookupClient::new(Duration::from_secs(2)).unwrap();

        let err = client.query(&addr).await.unwrap_err();
        assert!(err.to_string().contains("decode body"));
    }
}
