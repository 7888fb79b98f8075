//! ProducerManager - the producer pool of one traffic category

use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use contracts::{Connector, NodeAddress, ProducerConfig, ProducerManagerConfig};

use crate::admin::{AdminAction, AdminClient, AdminReport};
use crate::client::ProducerClient;
use crate::discovery::{http_client, DiscoveryReport, LookupClient};
use crate::error::ProducerError;

type Client<K> = ProducerClient<<K as Connector>::Connection>;

/// Pool of producer clients over the broker nodes of one category
///
/// Broker nodes are discovered through the category's lookup addresses;
/// each discovered node gets `pool_size` clients. The pool sits behind an
/// `RwLock`, so publishes keep reading while a refresh swaps it.
pub struct ProducerManager<K: Connector> {
    category: String,
    config: ProducerManagerConfig,
    client_config: ProducerConfig,
    lookups: Vec<String>,
    connector: Arc<K>,
    lookup: LookupClient,
    admin: AdminClient,
    producers: RwLock<Vec<Arc<Client<K>>>>,
    refresher: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl<K: Connector> ProducerManager<K> {
    /// Validate `config`, discover the broker nodes and build the pool
    ///
    /// Lookups that fail contribute no nodes. A node the connector refuses
    /// is skipped, unless `fail_on_conn_err` is set.
    ///
    /// # Errors
    /// `InvalidConfig` for a rejected config; the connector error when
    /// `fail_on_conn_err` is set and a node is refused.
    #[instrument(name = "producer_manager_new", skip(config, connector), fields(category = %config.category))]
    pub async fn new(
        config: ProducerManagerConfig,
        connector: Arc<K>,
    ) -> Result<Self, ProducerError> {
        config
            .validate()
            .map_err(|e| ProducerError::invalid_config(&config.category, e.to_string()))?;
        let config = config.with_defaults();

        let http = http_client(config.lookup_timeout())?;
        let manager = Self {
            category: config.category.clone(),
            client_config: config.client_config(),
            lookups: config.lookup_addresses(),
            connector,
            lookup: LookupClient::with_client(http.clone()),
            admin: AdminClient::with_client(http),
            producers: RwLock::new(Vec::new()),
            refresher: Mutex::new(None),
            shut_down: AtomicBool::new(false),
            config,
        };

        let report = manager.discover().await;
        let pool = manager.build_pool(&report.nodes)?;
        info!(
            category = %manager.category,
            nodes = report.nodes.len(),
            failed_lookups = report.failures.len(),
            pool_size = pool.len(),
            "Producer manager ready"
        );
        *manager.write_pool() = pool;
        observability::record_pool_size(&manager.category, manager.pool_size());

        Ok(manager)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn config(&self) -> &ProducerManagerConfig {
        &self.config
    }

    /// Lookup addresses in configuration order
    pub fn lookups(&self) -> &[String] {
        &self.lookups
    }

    /// Number of live clients
    pub fn pool_size(&self) -> usize {
        self.read_pool().len()
    }

    /// Address reported by every client's connection, in pool order
    ///
    /// `HttpConnection` reports the node's HTTP address.
    pub fn producer_addresses(&self) -> Vec<String> {
        self.read_pool()
            .iter()
            .map(|p| p.address().to_string())
            .collect()
    }

    /// Pick one client uniformly at random; `None` on an empty pool
    pub fn get_producer(&self) -> Option<Arc<Client<K>>> {
        let pool = self.read_pool();
        if pool.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..pool.len());
        pool.get(index).cloned()
    }

    /// Query every lookup for the current broker nodes
    pub async fn discover(&self) -> DiscoveryReport {
        let report = self
            .lookup
            .discover(&self.lookups, self.config.dedupe_nodes)
            .await;
        observability::record_discovery(&self.category, report.nodes.len(), report.failures.len());
        report
    }

    /// Rediscover the broker nodes and replace the pool
    ///
    /// Replaced clients are drained after the swap. After `shutdown` the
    /// rebuilt pool is drained instead and the manager stays empty.
    #[instrument(name = "producer_manager_refresh", skip(self), fields(category = %self.category))]
    pub async fn refresh(&self) -> Result<DiscoveryReport, ProducerError> {
        let report = self.discover().await;
        let pool = self.build_pool(&report.nodes)?;
        let size = pool.len();

        let swapped = {
            let mut producers = self.write_pool();
            // Checked under the pool lock; shutdown sets it before taking the pool
            if self.is_shut_down() {
                Err(pool)
            } else {
                Ok(std::mem::replace(&mut *producers, pool))
            }
        };
        let replaced = match swapped {
            Ok(replaced) => replaced,
            Err(discarded) => {
                debug!(category = %self.category, "Manager shut down, discarding refreshed pool");
                for client in discarded {
                    client.shutdown().await;
                }
                return Ok(report);
            }
        };
        observability::record_pool_size(&self.category, size);
        info!(
            category = %self.category,
            pool_size = size,
            replaced = replaced.len(),
            "Producer pool refreshed"
        );

        for client in replaced {
            client.shutdown().await;
        }
        Ok(report)
    }

    /// Refresh every `interval` until the manager is shut down or dropped
    pub fn spawn_refresh(self: &Arc<Self>, interval: Duration) {
        if self.is_shut_down() {
            return;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        let category = self.category.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; construction just discovered
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };
                if let Err(e) = manager.refresh().await {
                    warn!(category = %category, error = %e, "Periodic refresh failed");
                }
            }
            debug!(category = %category, "Refresher stopped");
        });

        let previous = self
            .refresher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub async fn create_topic(&self, topic: &str) -> Result<AdminReport, ProducerError> {
        self.administer(AdminAction::CreateTopic {
            topic: topic.to_string(),
        })
        .await
    }

    pub async fn delete_topic(&self, topic: &str) -> Result<AdminReport, ProducerError> {
        self.administer(AdminAction::DeleteTopic {
            topic: topic.to_string(),
        })
        .await
    }

    pub async fn create_channel(
        &self,
        topic: &str,
        channel: &str,
    ) -> Result<AdminReport, ProducerError> {
        self.administer(AdminAction::CreateChannel {
            topic: topic.to_string(),
            channel: channel.to_string(),
        })
        .await
    }

    pub async fn delete_channel(
        &self,
        topic: &str,
        channel: &str,
    ) -> Result<AdminReport, ProducerError> {
        self.administer(AdminAction::DeleteChannel {
            topic: topic.to_string(),
            channel: channel.to_string(),
        })
        .await
    }

    /// Send `action` to every node currently reported by the lookups
    ///
    /// # Errors
    /// `NoNodesAvailable` when discovery returns no node; no admin request is sent.
    #[instrument(name = "producer_manager_admin", skip(self), fields(category = %self.category))]
    pub async fn administer(&self, action: AdminAction) -> Result<AdminReport, ProducerError> {
        let nodes = self.discover().await.http_addrs();
        if nodes.is_empty() {
            warn!(category = %self.category, action = %action, "No broker nodes for admin request");
            return Err(ProducerError::no_nodes_available(&self.category));
        }

        let report = self.admin.fan_out(&nodes, &action).await;
        info!(
            category = %self.category,
            action = %action,
            attempted = report.attempted,
            failed = report.failures.len(),
            "Admin request fanned out"
        );
        Ok(report)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop the refresher and drain every client
    ///
    /// A refresh still running afterwards drains the pool it built.
    #[instrument(name = "producer_manager_shutdown", skip(self), fields(category = %self.category))]
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);

        let refresher = self
            .refresher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(refresher) = refresher {
            refresher.abort();
            if let Err(e) = refresher.await {
                if !e.is_cancelled() {
                    warn!(category = %self.category, error = %e, "Refresher panicked");
                }
            }
        }

        let pool = std::mem::take(&mut *self.write_pool());
        observability::record_pool_size(&self.category, 0);
        for client in pool {
            client.shutdown().await;
        }
        debug!(category = %self.category, "Producer manager shutdown complete");
    }

    fn build_pool(&self, nodes: &[NodeAddress]) -> Result<Vec<Arc<Client<K>>>, ProducerError> {
        let pool_size = self.config.pool_size;
        let mut pool = Vec::with_capacity(nodes.len() * pool_size);

        'nodes: for node in nodes {
            for _ in 0..pool_size {
                match self.connector.connect(node, &self.client_config) {
                    Ok(connection) => pool.push(Arc::new(ProducerClient::spawn(
                        connection,
                        self.client_config.queue_capacity(),
                    ))),
                    Err(e) if self.client_config.fail_on_conn_err => {
                        // Clients already built stop once their handles drop
                        return Err(e.into());
                    }
                    Err(e) => {
                        warn!(
                            category = %self.category,
                            node = %node,
                            error = %e,
                            "Skipping broker node"
                        );
                        continue 'nodes;
                    }
                }
            }
        }

        Ok(pool)
    }

    fn read_pool(&self) -> RwLockReadGuard<'_, Vec<Arc<Client<K>>>> {
        self.producers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_pool(&self) -> RwLockWriteGuard<'_, Vec<Arc<Client<K>>>> {
        self.producers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
