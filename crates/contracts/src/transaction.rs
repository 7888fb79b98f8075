//! Publish request / result types

use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::ContractError;

/// One queued publish request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishData {
    pub topic: String,
    pub body: Bytes,
    /// Delivery deferral; `None` publishes immediately
    pub delay: Option<Duration>,
}

impl PublishData {
    pub fn new(topic: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            body: body.into(),
            delay: None,
        }
    }

    /// Request delivered to consumers after `delay`
    pub fn deferred(topic: impl Into<String>, body: impl Into<Bytes>, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(topic, body)
        }
    }
}

/// Outcome of one asynchronous publish
///
/// Written exactly once to the caller's done channel when the broker
/// acknowledges (or fails to acknowledge) the message.
#[derive(Debug)]
pub struct ProducerTransaction {
    /// Topic the message was published to
    pub topic: String,
    /// Address reported by the connection that sent the message
    ///
    /// `HttpConnection` reports the node's HTTP address, `MockConnection`
    /// its TCP address.
    pub node: String,
    /// Payload size in bytes
    pub body_len: usize,
    /// Deferral requested by the caller
    pub delay: Option<Duration>,
    /// Broker acknowledgement
    pub result: Result<(), ContractError>,
}

impl ProducerTransaction {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Sender half handed to async publish entry points
pub type DoneSender = mpsc::Sender<ProducerTransaction>;
