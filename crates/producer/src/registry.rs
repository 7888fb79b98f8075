//! Registry - category name to producer manager
//!
//! Built once at startup from the `ManagerConfig` and handed to callers;
//! every publish and admin entry point is keyed by category.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, instrument};

use contracts::{Connector, DoneSender, ManagerConfig, ProducerManagerConfig};

use crate::admin::AdminReport;
use crate::error::ProducerError;
use crate::manager::ProducerManager;

/// Producer managers keyed by category
pub struct Registry<K: Connector> {
    connector: Arc<K>,
    managers: RwLock<HashMap<String, Arc<ProducerManager<K>>>>,
}

impl<K: Connector> Registry<K> {
    /// Empty registry; managers are added with `add_producer_manager`
    pub fn new(connector: K) -> Self {
        Self {
            connector: Arc::new(connector),
            managers: RwLock::new(HashMap::new()),
        }
    }

    /// Build one manager per configured category
    ///
    /// Categories with a refresh interval get a periodic refresher.
    #[instrument(
        name = "registry_initialize",
        skip(config, connector),
        fields(categories = config.categories.len())
    )]
    pub async fn initialize(config: &ManagerConfig, connector: K) -> Result<Self, ProducerError> {
        let registry = Self::new(connector);
        for category in &config.categories {
            let manager = registry.add_producer_manager(category.clone()).await?;
            if let Some(interval) = category.refresh_interval() {
                manager.spawn_refresh(interval);
            }
        }
        info!(categories = ?registry.categories(), "Registry initialized");
        Ok(registry)
    }

    /// Construct and register a manager for `config.category`
    ///
    /// A category that is already registered keeps its manager; the
    /// existing one is returned and `config` is ignored.
    pub async fn add_producer_manager(
        &self,
        config: ProducerManagerConfig,
    ) -> Result<Arc<ProducerManager<K>>, ProducerError> {
        if let Some(existing) = self.get(&config.category) {
            debug!(category = %config.category, "Category already registered");
            return Ok(existing);
        }

        let category = config.category.clone();
        let manager = Arc::new(ProducerManager::new(config, Arc::clone(&self.connector)).await?);

        let (registered, raced) = {
            let mut managers = self.write_managers();
            match managers.get(&category) {
                Some(existing) => (Arc::clone(existing), true),
                None => {
                    managers.insert(category, Arc::clone(&manager));
                    (manager.clone(), false)
                }
            }
        };

        // Another task registered the category while this manager was built
        if raced {
            manager.shutdown().await;
        }
        Ok(registered)
    }

    pub fn get(&self, category: &str) -> Option<Arc<ProducerManager<K>>> {
        self.read_managers().get(category).cloned()
    }

    /// Registered categories, sorted
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<_> = self.read_managers().keys().cloned().collect();
        categories.sort();
        categories
    }

    pub(crate) fn remove(&self, category: &str) -> Option<Arc<ProducerManager<K>>> {
        self.write_managers().remove(category)
    }

    /// Enqueue a publish on one of the category's clients
    pub async fn publish(
        &self,
        category: &str,
        topic: &str,
        body: impl Into<Bytes>,
    ) -> Result<(), ProducerError> {
        let manager = self.manager(category)?;
        let producer = manager
            .get_producer()
            .ok_or_else(|| ProducerError::no_producer_available(category))?;
        producer.publish(topic, body).await
    }

    /// Enqueue a publish whose outcome is written to `done`
    ///
    /// # Errors
    /// `CategoryNotRegistered` / `NoProducerAvailable`, before any network call
    pub async fn publish_async(
        &self,
        category: &str,
        topic: &str,
        body: impl Into<Bytes>,
        done: DoneSender,
    ) -> Result<(), ProducerError> {
        let manager = self.manager(category)?;
        let producer = manager
            .get_producer()
            .ok_or_else(|| ProducerError::no_producer_available(category))?;
        producer.publish_async(topic, body, done).await
    }

    /// Deferred variant of `publish_async`
    pub async fn deferred_publish_async(
        &self,
        category: &str,
        topic: &str,
        body: impl Into<Bytes>,
        done: DoneSender,
        delay: Duration,
    ) -> Result<(), ProducerError> {
        let manager = self.manager(category)?;
        let producer = manager
            .get_producer()
            .ok_or_else(|| ProducerError::no_producer_available(category))?;
        producer.deferred_publish_async(topic, body, delay, done).await
    }

    pub async fn create_topic(
        &self,
        category: &str,
        topic: &str,
    ) -> Result<AdminReport, ProducerError> {
        self.manager(category)?.create_topic(topic).await
    }

    pub async fn delete_topic(
        &self,
        category: &str,
        topic: &str,
    ) -> Result<AdminReport, ProducerError> {
        self.manager(category)?.delete_topic(topic).await
    }

    pub async fn create_channel(
        &self,
        category: &str,
        topic: &str,
        channel: &str,
    ) -> Result<AdminReport, ProducerError> {
        self.manager(category)?.create_channel(topic, channel).await
    }

    pub async fn delete_channel(
        &self,
        category: &str,
        topic: &str,
        channel: &str,
    ) -> Result<AdminReport, ProducerError> {
        self.manager(category)?.delete_channel(topic, channel).await
    }

    /// Unregister and drain every manager
    #[instrument(name = "registry_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        for category in self.categories() {
            if let Some(manager) = self.remove(&category) {
                manager.shutdown().await;
            }
        }
        debug!("Registry shutdown complete");
    }

    fn manager(&self, category: &str) -> Result<Arc<ProducerManager<K>>, ProducerError> {
        self.get(category)
            .ok_or_else(|| ProducerError::category_not_registered(category))
    }

    fn read_managers(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<ProducerManager<K>>>> {
        self.managers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_managers(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<ProducerManager<K>>>> {
        self.managers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
