//! BrokerConnection trait - data-plane driver interface
//!
//! The broker wire protocol belongs to the driver. The producer pool only needs
//! "publish", "publish later" and "stop" against one node, plus a way to open
//! such a connection for a discovered node.

use bytes::Bytes;
use std::time::Duration;

use crate::{ContractError, NodeAddress, ProducerConfig};

/// One publisher connection to one broker node
///
/// The owning client keeps several publishes awaiting acknowledgement at
/// once, so implementations are shared by reference across those futures.
#[trait_variant::make(BrokerConnection: Send)]
pub trait LocalBrokerConnection {
    /// Node address this connection publishes to (used for logging/metrics)
    fn address(&self) -> &str;

    /// Publish one message and wait for the broker's acknowledgement
    ///
    /// # Errors
    /// Returns publish error (should include address and topic)
    async fn publish(&self, topic: &str, body: Bytes) -> Result<(), ContractError>;

    /// Publish one message delivered to consumers after `delay`
    async fn deferred_publish(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
    ) -> Result<(), ContractError>;

    /// Close the connection; later publishes fail with `ConnectionStopped`
    async fn stop(&self);
}

/// Opens broker connections for discovered nodes
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced by this connector
    type Connection: BrokerConnection + Sync + 'static;

    /// Open a connection to `node` using `config` timeouts
    ///
    /// # Errors
    /// Returns connection error when the driver refuses the node
    fn connect(
        &self,
        node: &NodeAddress,
        config: &ProducerConfig,
    ) -> Result<Self::Connection, ContractError>;
}
