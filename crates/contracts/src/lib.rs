//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Contents
//! - Broker configuration (`ManagerConfig`, `ProducerManagerConfig`, `ProducerConfig`)
//! - Lookup service data model (`NodesData`, `NodeData`, `NodeAddress`)
//! - Data-plane seams (`BrokerConnection`, `Connector`)
//! - Publish results (`ProducerTransaction`)

mod config;
mod connection;
mod error;
mod lookup;
mod transaction;

pub use config::*;
pub use connection::{BrokerConnection, Connector, LocalBrokerConnection};
pub use error::*;
pub use lookup::*;
pub use transaction::*;
