//! # Producer
//!
//! Broker producer pool: one `ProducerManager` per traffic category, each
//! owning a pool of `ProducerClient`s over connections to the broker nodes
//! reported by the configured lookup nodes.
//!
//! ```ignore
//! let registry = Registry::initialize(&config, HttpConnector::new()).await?;
//! registry.publish_async("orders", "order.created", body, done_tx).await?;
//! registry.create_topic("orders", "order.created").await?;
//! ```

pub mod admin;
pub mod client;
pub mod discovery;
pub mod error;
pub mod http_connection;
pub mod manager;
pub mod metrics;
pub mod mock;
pub mod registry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use admin::{AdminAction, AdminClient, AdminFailure, AdminReport};
pub use client::ProducerClient;
pub use discovery::{DiscoveryReport, LookupClient, LookupFailure};
pub use error::ProducerError;
pub use http_connection::{HttpConnection, HttpConnector};
pub use manager::ProducerManager;
pub use metrics::{ProducerMetrics, ProducerMetricsSnapshot};
pub use mock::{MockConnection, MockConnector, MockPublish};
pub use registry::Registry;
