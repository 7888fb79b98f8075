//! ProducerClient - one broker connection behind its own publish queue

use bytes::Bytes;
use futures::stream::{FuturesOrdered, StreamExt};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{BrokerConnection, ContractError, DoneSender, ProducerTransaction, PublishData};

use crate::error::ProducerError;
use crate::metrics::ProducerMetrics;

enum Control {
    /// Exit without draining the queue
    Stop,
    /// Forward everything queued, then exit
    Drain(oneshot::Sender<()>),
}

/// Where the outcome of a queued publish goes
enum Reply {
    /// Failures are logged and counted only
    Silent,
    /// A `ProducerTransaction` is written to the caller's done channel
    Done(DoneSender),
    /// The broker result is handed back to a waiting `publish_sync`
    Ack(oneshot::Sender<Result<(), ContractError>>),
}

struct Request {
    data: PublishData,
    reply: Reply,
}

/// Handle to a running producer client
///
/// Every publish goes through one bounded queue and leaves the client in
/// enqueue order. At most `max_concurrency` publishes wait for their broker
/// acknowledgement at any time.
pub struct ProducerClient<C> {
    address: String,
    tx: mpsc::Sender<Request>,
    control_tx: mpsc::Sender<Control>,
    metrics: Arc<ProducerMetrics>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
    _connection: std::marker::PhantomData<fn() -> C>,
}

impl<C> ProducerClient<C>
where
    C: BrokerConnection + Sync + 'static,
{
    /// Take ownership of `connection` and spawn the publish loop
    ///
    /// `max_concurrency` bounds both the queue and the unacknowledged
    /// publishes; zero is treated as one.
    pub fn spawn(connection: C, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        let address = connection.address().to_string();
        let (tx, rx) = mpsc::channel(max_concurrency);
        let (control_tx, control_rx) = mpsc::channel(1);
        let metrics = Arc::new(ProducerMetrics::new());

        let worker_handle = tokio::spawn(publish_loop(
            connection,
            rx,
            control_rx,
            Arc::clone(&metrics),
            address.clone(),
            max_concurrency,
        ));

        Self {
            address,
            tx,
            control_tx,
            metrics,
            worker_handle: Mutex::new(Some(worker_handle)),
            _connection: std::marker::PhantomData,
        }
    }

    /// Address reported by the connection
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn metrics(&self) -> &Arc<ProducerMetrics> {
        &self.metrics
    }

    /// Whether the publish loop has exited
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    /// Enqueue a publish; waits only while the queue is full
    ///
    /// Broker failures of these publishes are logged and counted, not returned.
    pub async fn publish(
        &self,
        topic: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Result<(), ProducerError> {
        self.enqueue(PublishData::new(topic, body), Reply::Silent)
            .await
    }

    /// Publish and wait for the broker's acknowledgement
    pub async fn publish_sync(
        &self,
        topic: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Result<(), ProducerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.enqueue(PublishData::new(topic, body), Reply::Ack(ack_tx))
            .await?;

        ack_rx
            .await
            .map_err(|_| ProducerError::client_stopped(&self.address))?
            .map_err(ProducerError::from)
    }

    /// Enqueue a publish whose outcome is written to `done`
    pub async fn publish_async(
        &self,
        topic: impl Into<String>,
        body: impl Into<Bytes>,
        done: DoneSender,
    ) -> Result<(), ProducerError> {
        self.enqueue(PublishData::new(topic, body), Reply::Done(done))
            .await
    }

    /// Deferred variant of `publish_async`
    pub async fn deferred_publish_async(
        &self,
        topic: impl Into<String>,
        body: impl Into<Bytes>,
        delay: Duration,
        done: DoneSender,
    ) -> Result<(), ProducerError> {
        self.enqueue(PublishData::deferred(topic, body, delay), Reply::Done(done))
            .await
    }

    async fn enqueue(&self, data: PublishData, reply: Reply) -> Result<(), ProducerError> {
        self.tx
            .send(Request { data, reply })
            .await
            .map_err(|_| ProducerError::client_stopped(&self.address))?;
        self.metrics.inc_enqueued();
        self.metrics.set_queue_len(self.queued());
        observability::record_publish_enqueued(&self.address);
        Ok(())
    }

    /// Request the publish loop to exit (non-blocking)
    ///
    /// Messages still queued may or may not be forwarded. Async publishes
    /// that are dropped never produce a transaction.
    pub fn stop(&self) {
        // A full control channel already holds a stop or drain request
        let _ = self.control_tx.try_send(Control::Stop);
    }

    /// Forward every queued message, wait for their acknowledgements, stop
    /// the connection, join the loop
    #[instrument(name = "producer_client_shutdown", skip(self), fields(node = %self.address))]
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.control_tx.send(Control::Drain(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }

        let handle = self
            .worker_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(node = %self.address, error = ?e, "Publish loop panicked");
            }
        }
        debug!(node = %self.address, "ProducerClient shutdown complete");
    }

    fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Worker task: the only sender on the connection
///
/// Requests are started in queue order and kept in a window of at most
/// `max_in_flight` unacknowledged publishes.
#[instrument(
    name = "producer_publish_loop",
    skip(connection, rx, control_rx, metrics),
    fields(node = %address)
)]
async fn publish_loop<C: BrokerConnection + Sync>(
    connection: C,
    mut rx: mpsc::Receiver<Request>,
    mut control_rx: mpsc::Receiver<Control>,
    metrics: Arc<ProducerMetrics>,
    address: String,
    max_in_flight: usize,
) {
    debug!(node = %address, max_in_flight, "Publish loop started");

    let mut in_flight = FuturesOrdered::new();
    let mut intake_done = false;
    let mut drain_ack = None;

    loop {
        if intake_done && in_flight.is_empty() {
            break;
        }

        tokio::select! {
            control = control_rx.recv(), if drain_ack.is_none() && !intake_done => match control {
                Some(Control::Drain(ack)) => {
                    rx.close();
                    drain_ack = Some(ack);
                }
                Some(Control::Stop) | None => break,
            },
            request = rx.recv(), if !intake_done && in_flight.len() < max_in_flight => match request {
                Some(request) => {
                    metrics.set_queue_len(rx.len());
                    in_flight.push_back(send(&connection, request, &metrics, &address));
                }
                None => intake_done = true,
            },
            Some(()) = in_flight.next(), if !in_flight.is_empty() => {}
            else => break,
        }
    }

    if !in_flight.is_empty() {
        warn!(node = %address, abandoned = in_flight.len(), "Publish loop stopped with unacknowledged publishes");
    }
    drop(in_flight);
    connection.stop().await;
    metrics.set_queue_len(0);
    if let Some(ack) = drain_ack {
        let _ = ack.send(());
    }
    debug!(node = %address, "Publish loop stopped");
}

async fn send<C: BrokerConnection>(
    connection: &C,
    request: Request,
    metrics: &ProducerMetrics,
    address: &str,
) {
    let Request { data, reply } = request;
    let PublishData { topic, body, delay } = data;
    let body_len = body.len();
    let started = Instant::now();

    let result = match delay {
        Some(delay) => connection.deferred_publish(&topic, delay, body).await,
        None => connection.publish(&topic, body).await,
    };

    metrics.record_result(result.is_ok());
    observability::record_publish(address, result.is_ok());
    observability::record_publish_latency_ms(started.elapsed().as_secs_f64() * 1000.0);

    match reply {
        Reply::Silent => {
            if let Err(e) = result {
                // Continue processing - don't crash on single failure
                error!(node = %address, topic = %topic, error = %e, "Publish failed");
            }
        }
        Reply::Ack(ack) => {
            let _ = ack.send(result);
        }
        Reply::Done(done) => {
            if let Err(e) = &result {
                warn!(node = %address, topic = %topic, error = %e, "Async publish failed");
            }
            let transaction = ProducerTransaction {
                topic,
                node: address.to_string(),
                body_len,
                delay,
                result,
            };
            if done.send(transaction).await.is_err() {
                debug!("Done channel closed before transaction delivery");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConnection, MockConnector};
    use contracts::{Connector, NodeAddress, ProducerConfig};
    use tokio::time::{sleep, timeout};

    fn client(
        connector: &MockConnector,
        node: &str,
        max_concurrency: usize,
    ) -> ProducerClient<MockConnection> {
        let connection = connector
            .connect(
                &NodeAddress::new(node, node),
                &ProducerConfig::default().with_defaults(),
            )
            .unwrap();
        ProducerClient::spawn(connection, max_concurrency)
    }

    fn bodies(connector: &MockConnector) -> Vec<String> {
        connector
            .published()
            .into_iter()
            .map(|p| String::from_utf8(p.body.to_vec()).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_queued_publishes_forwarded_in_order() {
        let connector = MockConnector::new();
        let client = client(&connector, "a:4150", 4);

        for i in 0..10 {
            client.publish("orders", format!("m{i}")).await.unwrap();
        }
        client.shutdown().await;

        let expected: Vec<_> = (0..10).map(|i| format!("m{i}")).collect();
        assert_eq!(bodies(&connector), expected);
        assert_eq!(client.metrics().published(), 10);
        assert_eq!(connector.stopped_connections(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_async_publishes_leave_in_enqueue_order() {
        let connector = MockConnector::new();
        let client = client(&connector, "a:4150", 8);
        let (done_tx, mut done_rx) = mpsc::channel(512);

        for i in 0..300 {
            client
                .publish_async("orders", format!("{i:03}"), done_tx.clone())
                .await
                .unwrap();
        }
        drop(done_tx);

        let mut acknowledged = 0;
        while let Some(transaction) = done_rx.recv().await {
            assert!(transaction.is_ok());
            acknowledged += 1;
        }
        assert_eq!(acknowledged, 300);

        let expected: Vec<_> = (0..300).map(|i| format!("{i:03}")).collect();
        assert_eq!(bodies(&connector), expected);
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_async_publishes_respect_concurrency_ceiling() {
        let connector = MockConnector::new();
        connector.set_publish_delay(Duration::from_millis(20));
        let serial = client(&connector, "a:4150", 1);
        let (done_tx, mut done_rx) = mpsc::channel(16);

        let started = Instant::now();
        for i in 0..5 {
            serial
                .publish_async("orders", format!("m{i}"), done_tx.clone())
                .await
                .unwrap();
        }
        for _ in 0..5 {
            assert!(done_rx.recv().await.unwrap().is_ok());
        }
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(connector.peak_in_flight(), 1);
        serial.shutdown().await;

        let pipelined = client(&connector, "b:4150", 3);
        for i in 0..9 {
            pipelined
                .deferred_publish_async("orders", format!("d{i}"), Duration::from_secs(1), done_tx.clone())
                .await
                .unwrap();
        }
        for _ in 0..9 {
            assert!(done_rx.recv().await.unwrap().is_ok());
        }
        assert_eq!(connector.peak_in_flight(), 3);
        pipelined.shutdown().await;
    }

    #[tokio::test]
    async fn test_publish_after_stop_fails() {
        let connector = MockConnector::new();
        let client = client(&connector, "a:4150", 1);

        client.stop();
        timeout(Duration::from_secs(2), async {
            while !client.is_stopped() {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let result = client.publish("orders", "late").await;
        assert!(matches!(result, Err(ProducerError::ClientStopped { .. })));
        assert!(client.publish_sync("orders", "late").await.is_err());
        assert_eq!(connector.stopped_connections(), 1);
    }

    #[tokio::test]
    async fn test_queued_publish_failure_is_counted_not_returned() {
        let connector = MockConnector::new();
        connector.fail_publishes("a:4150");
        let client = client(&connector, "a:4150", 1);

        client.publish("orders", "x").await.unwrap();
        client.shutdown().await;

        assert_eq!(client.metrics().failed(), 1);
        assert!(connector.published().is_empty());
    }

    #[tokio::test]
    async fn test_publish_sync_surfaces_broker_result() {
        let connector = MockConnector::new();
        connector.fail_publishes("b:4150");
        let ok = client(&connector, "a:4150", 1);
        let failing = client(&connector, "b:4150", 1);

        ok.publish_sync("orders", "x").await.unwrap();
        let result = failing.publish_sync("orders", "x").await;
        assert!(matches!(
            result,
            Err(ProducerError::Contract(ContractError::Publish { .. }))
        ));

        assert_eq!(ok.metrics().published(), 1);
        assert_eq!(failing.metrics().failed(), 1);
        assert_eq!(connector.published().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_async_reports_transaction() {
        let connector = MockConnector::new();
        let client = client(&connector, "a:4150", 1);
        let (done_tx, mut done_rx) = mpsc::channel(4);

        client
            .publish_async("orders", "now", done_tx.clone())
            .await
            .unwrap();
        client
            .deferred_publish_async("orders", "later", Duration::from_secs(3), done_tx)
            .await
            .unwrap();

        let first = done_rx.recv().await.unwrap();
        let second = done_rx.recv().await.unwrap();
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(first.node, "a:4150");
        assert_eq!(first.delay, None);
        assert_eq!(second.delay, Some(Duration::from_secs(3)));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_publish_async_failure_delivered_on_done_channel() {
        let connector = MockConnector::new();
        connector.fail_publishes("a:4150");
        let client = client(&connector, "a:4150", 1);
        let (done_tx, mut done_rx) = mpsc::channel(1);

        client.publish_async("orders", "x", done_tx).await.unwrap();
        let tx = done_rx.recv().await.unwrap();
        assert!(matches!(tx.result, Err(ContractError::Publish { .. })));
        assert_eq!(tx.body_len, 1);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_unacknowledged_publishes() {
        let connector = MockConnector::new();
        connector.set_publish_delay(Duration::from_millis(30));
        let client = client(&connector, "a:4150", 2);
        let (done_tx, mut done_rx) = mpsc::channel(4);

        for i in 0..4 {
            client
                .publish_async("orders", format!("m{i}"), done_tx.clone())
                .await
                .unwrap();
        }
        drop(done_tx);
        client.shutdown().await;

        let mut delivered = 0;
        while done_rx.recv().await.is_some() {
            delivered += 1;
        }
        assert_eq!(delivered, 4);
        assert!(client.is_stopped());
    }
}
