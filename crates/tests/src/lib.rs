//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置兼容性测试（TOML / 旧版 JSON 字段名）
//! - 通过本地 HTTP 假节点的 e2e 发布与管理测试
//! - 调度 actor 串行化测试

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_legacy_json_field_names() {
        // 旧版配置使用 configs / producerConfigs / poolSize
        let content = r#"{
            "configs": [
                {
                    "category": "orders",
                    "producerConfigs": [{ "address": "lookup-a:4161" }],
                    "poolSize": 3
                }
            ]
        }"#;

        let config = ConfigLoader::load_from_str(content, ConfigFormat::Json).unwrap();
        let orders = config.category("orders").unwrap();
        assert_eq!(orders.pool_size, 3);
        assert_eq!(orders.lookup_addresses(), vec!["lookup-a:4161"]);
        assert!(orders.refresh_interval().is_none());
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let content = r#"
[[categories]]
category = "orders"
pool_size = 2
[[categories.producer_configs]]
address = "lookup-a:4161"
"#;
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        let rendered = ConfigLoader::to_toml(&config).unwrap();
        let reloaded = ConfigLoader::load_from_str(&rendered, ConfigFormat::Toml).unwrap();

        assert_eq!(reloaded.categories.len(), 1);
        assert_eq!(reloaded.categories[0].pool_size, 2);
    }
}

#[cfg(test)]
mod e2e_tests {
    use axum::http::StatusCode;
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ManagerConfig, ProducerManagerConfig, ProducerTransaction};
    use observability::PublishStatsAggregator;
    use producer::{HttpConnector, MockConnector, ProducerError, Registry};

    use producer::test_support::{
        fake_broker, fake_lookup, fake_lookup_shared, requests_on, FakeNode,
    };

    fn config_for(lookup: &str, pool_size: usize) -> ManagerConfig {
        let content = format!(
            r#"
[[categories]]
category = "orders"
pool_size = {pool_size}
lookup_timeout_ms = 2000

[[categories.producer_configs]]
address = "{lookup}"
dial_timeout_ms = 1000
"#
        );
        ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap()
    }

    async fn collect(
        mut done_rx: mpsc::Receiver<ProducerTransaction>,
        expected: usize,
    ) -> Vec<ProducerTransaction> {
        let mut transactions = Vec::with_capacity(expected);
        while transactions.len() < expected {
            let transaction = tokio::time::timeout(Duration::from_secs(5), done_rx.recv())
                .await
                .expect("acknowledgement timed out")
                .expect("done channel closed early");
            transactions.push(transaction);
        }
        transactions
    }

    #[tokio::test]
    async fn test_config_to_publish_over_http() {
        let (node_a, log_a) = fake_broker(StatusCode::OK).await;
        let (node_b, log_b) = fake_broker(StatusCode::OK).await;
        let lookup = fake_lookup(vec![FakeNode::at(&node_a), FakeNode::at(&node_b)]).await;

        let config = config_for(&lookup, 2);
        let registry = Registry::initialize(&config, HttpConnector::new())
            .await
            .unwrap();
        assert_eq!(registry.get("orders").unwrap().pool_size(), 4);

        let report = registry.create_topic("orders", "order.created").await.unwrap();
        assert_eq!(report.attempted, 2);
        assert!(report.is_complete());
        for log in [&log_a, &log_b] {
            assert_eq!(
                requests_on(log, "/topic/create"),
                vec!["/topic/create?topic=order.created"]
            );
        }

        let (done_tx, done_rx) = mpsc::channel(16);
        for i in 0..10 {
            registry
                .publish_async("orders", "order.created", format!("msg-{i}"), done_tx.clone())
                .await
                .unwrap();
        }
        registry
            .deferred_publish_async(
                "orders",
                "order.created",
                "later",
                done_tx,
                Duration::from_millis(250),
            )
            .await
            .unwrap();

        let transactions = collect(done_rx, 11).await;
        assert!(transactions.iter().all(ProducerTransaction::is_ok));

        let mut published = requests_on(&log_a, "/pub");
        published.extend(requests_on(&log_b, "/pub"));
        assert_eq!(published.len(), 11);
        assert!(published
            .iter()
            .all(|entry| entry.starts_with("/pub topic=order.created ")));

        let deferred: Vec<_> = published
            .iter()
            .filter(|entry| entry.contains(" defer="))
            .collect();
        assert_eq!(deferred, vec!["/pub topic=order.created defer=250 body=later"]);

        registry.shutdown().await;
        assert!(registry.categories().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_publish_is_reported_on_done_channel() {
        let (node, log) = fake_broker(StatusCode::INTERNAL_SERVER_ERROR).await;
        let lookup = fake_lookup(vec![FakeNode::at(&node)]).await;

        let registry = Registry::initialize(&config_for(&lookup, 1), HttpConnector::new())
            .await
            .unwrap();

        let started = Instant::now();
        let (done_tx, done_rx) = mpsc::channel(4);
        registry
            .publish_async("orders", "order.created", "x", done_tx)
            .await
            .unwrap();

        let transactions = collect(done_rx, 1).await;
        let mut stats = PublishStatsAggregator::new();
        for transaction in &transactions {
            stats.update(transaction, started.elapsed().as_secs_f64() * 1000.0);
        }

        let summary = stats.summary();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.node_failures[&node], 1);
        assert_eq!(requests_on(&log, "/pub"), vec!["/pub topic=order.created body=x"]);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_channel_admin_fans_out_to_every_node() {
        let (node_a, log_a) = fake_broker(StatusCode::OK).await;
        let (node_b, log_b) = fake_broker(StatusCode::NOT_FOUND).await;
        let lookup = fake_lookup(vec![FakeNode::at(&node_a), FakeNode::at(&node_b)]).await;

        let registry = Registry::initialize(&config_for(&lookup, 1), HttpConnector::new())
            .await
            .unwrap();

        let report = registry
            .create_channel("orders", "order.created", "billing")
            .await
            .unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failures[0].node, node_b);

        let report = registry
            .delete_channel("orders", "order.created", "billing")
            .await
            .unwrap();
        assert_eq!(report.attempted, 2);

        for log in [&log_a, &log_b] {
            assert_eq!(
                *log.lock().unwrap(),
                vec![
                    "/channel/create?topic=order.created&channel=billing",
                    "/channel/delete?topic=order.created&channel=billing",
                ]
            );
        }

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_pool_is_nodes_times_pool_size() {
        let lookup = fake_lookup(vec![
            FakeNode::new("10.0.0.1", 4150, 4151),
            FakeNode::new("10.0.0.2", 4150, 4151),
        ])
        .await;

        let connector = MockConnector::new();
        let registry = Registry::new(connector.clone());
        let manager = registry
            .add_producer_manager(ProducerManagerConfig::new("orders", vec![lookup], 2))
            .await
            .unwrap();

        assert_eq!(manager.pool_size(), 4);
        assert_eq!(connector.connections(), 4);

        let mut addresses = manager.producer_addresses();
        addresses.sort();
        assert_eq!(
            addresses,
            vec!["10.0.0.1:4150", "10.0.0.1:4150", "10.0.0.2:4150", "10.0.0.2:4150"]
        );

        registry.shutdown().await;
        assert_eq!(connector.stopped_connections(), 4);
    }

    #[tokio::test]
    async fn test_refresh_follows_lookup() {
        let (lookup, nodes) = fake_lookup_shared(vec![FakeNode::new("10.0.0.1", 4150, 4151)]).await;

        let connector = MockConnector::new();
        let registry = Registry::new(connector.clone());
        let manager = registry
            .add_producer_manager(ProducerManagerConfig::new("orders", vec![lookup], 1))
            .await
            .unwrap();
        assert_eq!(manager.pool_size(), 1);

        nodes.lock().unwrap().push(FakeNode::new("10.0.0.2", 4150, 4151));
        manager.refresh().await.unwrap();
        assert_eq!(manager.pool_size(), 2);
        assert_eq!(connector.stopped_connections(), 1);

        nodes.lock().unwrap().clear();
        manager.refresh().await.unwrap();
        assert_eq!(manager.pool_size(), 0);

        let (done_tx, _done_rx) = mpsc::channel(1);
        let result = registry.publish_async("orders", "t", "x", done_tx).await;
        assert!(matches!(result, Err(ProducerError::NoProducerAvailable { .. })));

        let result = registry.create_topic("orders", "t").await;
        assert!(matches!(result, Err(ProducerError::NoNodesAvailable { .. })));

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_periodic_refresh_picks_up_new_nodes() {
        let (lookup, nodes) = fake_lookup_shared(vec![]).await;
        let registry = Registry::new(MockConnector::new());
        let manager = registry
            .add_producer_manager(ProducerManagerConfig::new("orders", vec![lookup], 1))
            .await
            .unwrap();
        assert_eq!(manager.pool_size(), 0);

        manager.spawn_refresh(Duration::from_millis(50));
        nodes.lock().unwrap().push(FakeNode::new("10.0.0.1", 4150, 4151));

        let deadline = Instant::now() + Duration::from_secs(5);
        while manager.pool_size() == 0 {
            assert!(Instant::now() < deadline, "refresher never rebuilt the pool");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(manager.producer_addresses(), vec!["10.0.0.1:4150"]);

        registry.shutdown().await;
    }
}

#[cfg(test)]
mod dispatch_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    use dispatcher::{ActorClient, ExecutionMode};
    use producer::{MockConnector, Registry};

    use producer::test_support::{fake_lookup, FakeNode};

    #[tokio::test]
    async fn test_sync_operations_never_overlap() {
        let actor = Arc::new(ActorClient::new("counter", AtomicUsize::new(0)).unwrap());

        let mut handles = Vec::new();
        for _ in 0..20 {
            let actor = Arc::clone(&actor);
            handles.push(tokio::spawn(async move {
                actor
                    .execute(ExecutionMode::Sync, |counter| async move {
                        // Read-modify-write split by an await; loses updates unless serialized
                        let current = counter.load(Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        counter.store(current + 1, Ordering::SeqCst);
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(actor.client().load(Ordering::SeqCst), 20);
        let snapshot = actor.metrics().snapshot();
        assert_eq!(snapshot.accepted, 20);
        assert_eq!(snapshot.completed, 20);

        actor.shutdown().await;
    }

    #[tokio::test]
    async fn test_async_operation_does_not_block_sync_ones() {
        let actor = Arc::new(ActorClient::new("mixed", ()).unwrap());
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let waiting = {
            let actor = Arc::clone(&actor);
            tokio::spawn(async move {
                actor
                    .execute(ExecutionMode::Async, |_| async move {
                        let _ = release_rx.await;
                        "released"
                    })
                    .await
            })
        };

        let value = tokio::time::timeout(
            Duration::from_secs(2),
            actor.execute(ExecutionMode::Sync, |_| async { 7 }),
        )
        .await
        .expect("sync operation blocked behind async one")
        .unwrap();
        assert_eq!(value, 7);

        release_tx.send(()).unwrap();
        assert_eq!(waiting.await.unwrap().unwrap(), "released");

        actor.shutdown().await;
    }

    #[tokio::test]
    async fn test_registry_calls_through_actor() {
        let lookup = fake_lookup(vec![FakeNode::new("10.0.0.1", 4150, 4151)]).await;

        let connector = MockConnector::new();
        let registry = Registry::new(connector.clone());
        registry
            .add_producer_manager(contracts::ProducerManagerConfig::new(
                "orders",
                vec![lookup],
                2,
            ))
            .await
            .unwrap();
        let client = ActorClient::new("broker", registry).unwrap();

        let (done_tx, mut done_rx) = mpsc::channel(8);
        for i in 0..5 {
            let done = done_tx.clone();
            client
                .execute(ExecutionMode::Async, move |registry| async move {
                    registry
                        .publish_async("orders", "order.created", format!("m{i}"), done)
                        .await
                })
                .await
                .unwrap()
                .unwrap();
        }
        drop(done_tx);

        let mut acknowledged = 0;
        while let Some(transaction) = done_rx.recv().await {
            assert!(transaction.is_ok());
            acknowledged += 1;
        }
        assert_eq!(acknowledged, 5);
        assert_eq!(connector.published().len(), 5);

        client.client().shutdown().await;
        client.shutdown().await;
    }
}
