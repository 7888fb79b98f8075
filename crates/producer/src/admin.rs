//! Topic / channel administration fan-out

use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use contracts::ContractError;

use crate::discovery::http_client;

/// One administrative request against a broker node's HTTP API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    CreateTopic { topic: String },
    DeleteTopic { topic: String },
    CreateChannel { topic: String, channel: String },
    DeleteChannel { topic: String, channel: String },
}

impl AdminAction {
    /// Short name used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateTopic { .. } => "topic_create",
            Self::DeleteTopic { .. } => "topic_delete",
            Self::CreateChannel { .. } => "channel_create",
            Self::DeleteChannel { .. } => "channel_delete",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::CreateTopic { .. } => "/topic/create",
            Self::DeleteTopic { .. } => "/topic/delete",
            Self::CreateChannel { .. } => "/channel/create",
            Self::DeleteChannel { .. } => "/channel/delete",
        }
    }

    pub fn query(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::CreateTopic { topic } | Self::DeleteTopic { topic } => {
                vec![("topic", topic.as_str())]
            }
            Self::CreateChannel { topic, channel } | Self::DeleteChannel { topic, channel } => {
                vec![("topic", topic.as_str()), ("channel", channel.as_str())]
            }
        }
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTopic { topic } | Self::DeleteTopic { topic } => {
                write!(f, "{} topic={}", self.name(), topic)
            }
            Self::CreateChannel { topic, channel } | Self::DeleteChannel { topic, channel } => {
                write!(f, "{} topic={} channel={}", self.name(), topic, channel)
            }
        }
    }
}

/// A node that did not accept the request
#[derive(Debug)]
pub struct AdminFailure {
    pub node: String,
    pub error: ContractError,
}

/// Outcome of one fan-out
#[derive(Debug, Default)]
pub struct AdminReport {
    /// Nodes a request was sent to
    pub attempted: usize,
    pub failures: Vec<AdminFailure>,
}

impl AdminReport {
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    /// Every node accepted the request
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sends admin requests to broker nodes
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
}

impl AdminClient {
    pub fn new(timeout: Duration) -> Result<Self, ContractError> {
        Ok(Self::with_client(http_client(timeout)?))
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Send `action` to one node; the response body is discarded
    pub async fn send(&self, node: &str, action: &AdminAction) -> Result<(), ContractError> {
        let url = format!("http://{}{}", node, action.path());
        self.http
            .post(&url)
            .query(&action.query())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(|_| ())
            .map_err(|e| ContractError::admin(node, e.to_string()))
    }

    /// Send `action` to every node, absorbing per-node failures
    #[instrument(
        name = "admin_fan_out",
        skip(self, nodes),
        fields(action = %action, nodes = nodes.len())
    )]
    pub async fn fan_out(&self, nodes: &[String], action: &AdminAction) -> AdminReport {
        let mut report = AdminReport::default();

        for node in nodes {
            report.attempted += 1;
            let result = self.send(node, action).await;
            observability::record_admin(action.name(), node, result.is_ok());

            match result {
                Ok(()) => debug!(node = %node, "Admin request accepted"),
                Err(error) => {
                    warn!(node = %node, error = %error, "Admin request failed");
                    report.failures.push(AdminFailure {
                        node: node.clone(),
                        error,
                    });
                }
            }
        }

        report
    }
}
