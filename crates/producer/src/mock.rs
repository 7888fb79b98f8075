//! In-memory connector for tests and dry runs
//!
//! Records every publish instead of sending it. Connection refusals and
//! publish failures can be injected per node.

use bytes::Bytes;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{BrokerConnection, ContractError, Connector, NodeAddress, ProducerConfig};

/// One recorded publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPublish {
    pub node: String,
    pub topic: String,
    pub body: Bytes,
    pub delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct MockState {
    published: Mutex<Vec<MockPublish>>,
    refused_nodes: Mutex<HashSet<String>>,
    failing_nodes: Mutex<HashSet<String>>,
    connections: AtomicUsize,
    stopped: AtomicUsize,
    publish_delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connector handing out `MockConnection`s; clones share recorded state
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse connections to `node` (data-plane address)
    pub fn refuse(&self, node: impl Into<String>) {
        lock(&self.state.refused_nodes).insert(node.into());
    }

    /// Fail every publish to `node`
    pub fn fail_publishes(&self, node: impl Into<String>) {
        lock(&self.state.failing_nodes).insert(node.into());
    }

    /// Delay every publish acknowledgement
    pub fn set_publish_delay(&self, delay: Duration) {
        *lock(&self.state.publish_delay) = Some(delay);
    }

    /// Highest number of unacknowledged publishes seen at once
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Publishes recorded so far, in send order
    pub fn published(&self) -> Vec<MockPublish> {
        lock(&self.state.published).clone()
    }

    /// Connections opened so far
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Connections stopped so far
    pub fn stopped_connections(&self) -> usize {
        self.state.stopped.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    fn connect(
        &self,
        node: &NodeAddress,
        _config: &ProducerConfig,
    ) -> Result<MockConnection, ContractError> {
        if lock(&self.state.refused_nodes).contains(&node.tcp) {
            return Err(ContractError::connection(&node.tcp, "connection refused"));
        }
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            address: node.tcp.clone(),
            state: Arc::clone(&self.state),
            stopped: AtomicBool::new(false),
        })
    }
}

/// Recording connection to one node
#[derive(Debug)]
pub struct MockConnection {
    address: String,
    state: Arc<MockState>,
    stopped: AtomicBool,
}

impl MockConnection {
    /// Standalone connection outside any connector
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            state: Arc::default(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn published(&self) -> Vec<MockPublish> {
        lock(&self.state.published).clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// The publish is recorded when it is sent; the acknowledgement follows
    /// after the configured publish delay.
    async fn record(
        &self,
        topic: &str,
        body: Bytes,
        delay: Option<Duration>,
    ) -> Result<(), ContractError> {
        if self.is_stopped() {
            return Err(ContractError::ConnectionStopped {
                address: self.address.clone(),
            });
        }

        let in_flight = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let failing = lock(&self.state.failing_nodes).contains(&self.address);
        if !failing {
            lock(&self.state.published).push(MockPublish {
                node: self.address.clone(),
                topic: topic.to_string(),
                body,
                delay,
            });
        }

        let ack_delay = *lock(&self.state.publish_delay);
        if let Some(ack_delay) = ack_delay {
            tokio::time::sleep(ack_delay).await;
        }
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if failing {
            return Err(ContractError::publish(&self.address, topic, "E_PUB_FAILED"));
        }
        Ok(())
    }
}

impl BrokerConnection for MockConnection {
    fn address(&self) -> &str {
        &self.address
    }

    async fn publish(&self, topic: &str, body: Bytes) -> Result<(), ContractError> {
        self.record(topic, body, None).await
    }

    async fn deferred_publish(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
    ) -> Result<(), ContractError> {
        self.record(topic, body, Some(delay)).await
    }

    async fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.state.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }
}
