//! # Dispatcher
//!
//! Operation-serializing actor.
//!
//! Responsibilities:
//! - Accept `Operation`s over a rendezvous submission channel
//! - Run synchronous operations one at a time, in acceptance order
//! - Start asynchronous operations on independent tasks
//! - Signal completion exactly once per accepted operation
//!
//! `ActorClient` pairs a stateful driver client with its own actor so every
//! call against the client goes through the same serialization point.

pub mod actor;
pub mod client;
pub mod error;
pub mod metrics;
pub mod operation;

pub use actor::DispatchActor;
pub use client::ActorClient;
pub use error::DispatchError;
pub use metrics::{ActorMetrics, MetricsSnapshot};
pub use operation::{BoxFuture, Callback, Completion, ExecutionMode, Operation};
