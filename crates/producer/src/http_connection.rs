//! HttpConnection - publishes through a broker node's HTTP API
//!
//! `POST http://{node}/pub?topic=X` and `POST http://{node}/pub?topic=X&defer=<ms>`,
//! message as the request body.

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, instrument};

use contracts::{BrokerConnection, ContractError, Connector, NodeAddress, ProducerConfig};

/// Opens `HttpConnection`s on the node's admin-plane (HTTP) address
#[derive(Debug, Clone, Default)]
pub struct HttpConnector;

impl HttpConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for HttpConnector {
    type Connection = HttpConnection;

    fn connect(
        &self,
        node: &NodeAddress,
        config: &ProducerConfig,
    ) -> Result<HttpConnection, ContractError> {
        HttpConnection::new(&node.http, config)
    }
}

/// Publisher connection to one broker node over HTTP
#[derive(Debug)]
pub struct HttpConnection {
    address: String,
    http: reqwest::Client,
    stopped: AtomicBool,
}

impl HttpConnection {
    /// Build a connection honouring the dial and write/read timeouts of `config`
    pub fn new(address: impl Into<String>, config: &ProducerConfig) -> Result<Self, ContractError> {
        let address = address.into();
        let http = reqwest::Client::builder()
            .connect_timeout(config.dial_timeout())
            .timeout(config.write_timeout() + config.read_timeout())
            .build()
            .map_err(|e| ContractError::connection(&address, e.to_string()))?;

        debug!(node = %address, "HttpConnection created");
        Ok(Self {
            address,
            http,
            stopped: AtomicBool::new(false),
        })
    }

    async fn post(
        &self,
        topic: &str,
        defer: Option<Duration>,
        body: Bytes,
    ) -> Result<(), ContractError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(ContractError::ConnectionStopped {
                address: self.address.clone(),
            });
        }

        let url = format!("http://{}/pub", self.address);
        let mut request = self.http.post(&url).query(&[("topic", topic)]);
        if let Some(defer) = defer {
            request = request.query(&[("defer", defer.as_millis().to_string())]);
        }

        request
            .body(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(|_| ())
            .map_err(|e| ContractError::publish(&self.address, topic, e.to_string()))
    }
}

impl BrokerConnection for HttpConnection {
    fn address(&self) -> &str {
        &self.address
    }

    #[instrument(name = "http_publish", skip(self, body), fields(node = %self.address))]
    async fn publish(&self, topic: &str, body: Bytes) -> Result<(), ContractError> {
        self.post(topic, None, body).await
    }

    #[instrument(name = "http_deferred_publish", skip(self, body), fields(node = %self.address))]
    async fn deferred_publish(
        &self,
        topic: &str,
        delay: Duration,
        body: Bytes,
    ) -> Result<(), ContractError> {
        self.post(topic, Some(delay), body).await
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        debug!(node = %self.address, "HttpConnection stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fake_broker;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_publish_and_deferred_publish_urls() {
        let (addr, log) = fake_broker(StatusCode::OK).await;
        let conn = HttpConnection::new(&addr, &ProducerConfig::default().with_defaults()).unwrap();

        conn.publish("orders", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        conn.deferred_publish("orders", Duration::from_millis(1500), Bytes::from_static(b"later"))
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "/pub topic=orders body=hello",
                "/pub topic=orders defer=1500 body=later",
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_publish_and_stopped_connection() {
        let (addr, _) = fake_broker(StatusCode::BAD_REQUEST).await;
        let conn = HttpConnection::new(&addr, &ProducerConfig::default().with_defaults()).unwrap();

        let err = conn
            .publish("orders", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Publish { .. }));

        conn.stop().await;
        let err = conn
            .publish("orders", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::ConnectionStopped { .. }));
    }
}
