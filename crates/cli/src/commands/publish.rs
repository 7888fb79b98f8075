//! `publish` command implementation.
//!
//! Registry calls go through a dispatch actor: topic creation runs as a
//! synchronous operation before any publish is started, publishes are
//! fanned out as asynchronous operations.

use anyhow::Context;
use bytes::Bytes;
use std::io::BufRead;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use contracts::ProducerTransaction;
use dispatcher::{ActorClient, ExecutionMode};
use observability::PublishStatsAggregator;
use producer::{HttpConnector, Registry};

use crate::cli::PublishArgs;
use crate::error::{CliError, Result};

type PublishClient = ActorClient<Registry<HttpConnector>>;

/// Execute the `publish` command
pub async fn run_publish(args: &PublishArgs) -> Result<()> {
    let config = super::load_config(&args.config.config)?;
    let config = super::select_categories(config, Some(&args.category))?;

    if args.metrics_port != 0 {
        observability::init_metrics(args.metrics_port)
            .context("Failed to start metrics exporter")?;
    }

    let messages = if args.messages.is_empty() {
        read_stdin_messages()?
    } else {
        args.messages.clone()
    };

    let registry = Registry::initialize(&config, HttpConnector::new()).await?;
    let client = ActorClient::new("brokerctl-publish", registry)?;

    let result = tokio::select! {
        result = publish_all(&client, args, &messages) => result,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, abandoning unacknowledged messages");
            Err(anyhow::anyhow!("interrupted").into())
        }
    };

    client.shutdown().await;
    client.client().shutdown().await;
    result
}

async fn publish_all(
    client: &PublishClient,
    args: &PublishArgs,
    messages: &[String],
) -> Result<()> {
    if args.create_topic {
        let category = args.category.clone();
        let topic = args.topic.clone();
        let report = client
            .execute(ExecutionMode::Sync, move |registry| async move {
                registry.create_topic(&category, &topic).await
            })
            .await??;
        info!(
            topic = %args.topic,
            nodes = report.attempted,
            failed = report.failures.len(),
            "Topic created"
        );
    }

    let total = messages.len() as u64 * u64::from(args.repeat);
    let (done_tx, done_rx) = mpsc::channel(total.clamp(1, 1024) as usize);
    let delay = (args.defer_ms > 0).then(|| Duration::from_millis(args.defer_ms));
    let started = Instant::now();

    for _ in 0..args.repeat {
        for message in messages {
            let category = args.category.clone();
            let topic = args.topic.clone();
            let body = Bytes::from(message.clone());
            let done = done_tx.clone();

            client
                .execute(ExecutionMode::Async, move |registry| async move {
                    match delay {
                        Some(delay) => {
                            registry
                                .deferred_publish_async(&category, &topic, body, done, delay)
                                .await
                        }
                        None => registry.publish_async(&category, &topic, body, done).await,
                    }
                })
                .await??;
        }
    }
    drop(done_tx);

    info!(total = total, topic = %args.topic, "Messages submitted, waiting for acknowledgements");

    let stats = collect(done_rx, total, started, args.timeout).await;
    let summary = stats.summary();
    println!("{}", summary);

    let unacknowledged = total - summary.succeeded;
    if unacknowledged > 0 {
        return Err(CliError::PublishIncomplete {
            failed: unacknowledged,
            total,
        });
    }
    Ok(())
}

/// Gather one transaction per message, or until `timeout_secs` elapses
async fn collect(
    mut done_rx: mpsc::Receiver<ProducerTransaction>,
    total: u64,
    started: Instant,
    timeout_secs: u64,
) -> PublishStatsAggregator {
    let mut stats = PublishStatsAggregator::new();
    let deadline = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

    let gather = async {
        while stats.succeeded + stats.failed < total {
            let Some(transaction) = done_rx.recv().await else {
                break;
            };
            stats.update(&transaction, started.elapsed().as_secs_f64() * 1000.0);
        }
    };

    match deadline {
        Some(deadline) => {
            if tokio::time::timeout(deadline, gather).await.is_err() {
                warn!(timeout_secs, "Timed out waiting for acknowledgements");
            }
        }
        None => gather.await,
    }
    stats
}

fn read_stdin_messages() -> Result<Vec<String>> {
    let stdin = std::io::stdin();
    let mut messages = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        if !line.is_empty() {
            messages.push(line);
        }
    }
    Ok(messages)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;

    fn transaction(ok: bool) -> ProducerTransaction {
        ProducerTransaction {
            topic: "orders".into(),
            node: "a:4151".into(),
            body_len: 3,
            delay: None,
            result: if ok {
                Ok(())
            } else {
                Err(ContractError::publish("a:4151", "orders", "E_BAD_BODY"))
            },
        }
    }

    #[tokio::test]
    async fn test_collect_stops_after_total() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(transaction(true)).await.unwrap();
        tx.send(transaction(false)).await.unwrap();

        // Sender stays open: collection must end on the count alone
        let stats = collect(rx, 2, Instant::now(), 0).await;
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.failed, 1);
        drop(tx);
    }

    #[tokio::test]
    async fn test_collect_times_out() {
        let (tx, rx) = mpsc::channel(1);
        tx.send(transaction(true)).await.unwrap();

        let stats = collect(rx, 5, Instant::now(), 1).await;
        assert_eq!(stats.succeeded, 1);
        drop(tx);
    }
}
