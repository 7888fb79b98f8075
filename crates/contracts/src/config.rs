//! Broker configuration - Config Loader output
//!
//! One `ProducerManagerConfig` per traffic category. The `producer_configs`
//! entries name *lookup* nodes; broker nodes are discovered through them.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Default lookup/broker HTTP address
pub const DEFAULT_ADDRESS: &str = "localhost:4151";
/// Default publish queue capacity per producer client
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;
/// Default dial timeout
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
/// Default write timeout
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default lookup query timeout
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Process-level broker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ManagerConfig {
    /// One entry per traffic category
    #[serde(default, alias = "configs")]
    #[validate(nested)]
    pub categories: Vec<ProducerManagerConfig>,
}

impl ManagerConfig {
    /// Fill zero-valued fields of every category
    pub fn with_defaults(mut self) -> Self {
        self.categories = self
            .categories
            .into_iter()
            .map(ProducerManagerConfig::with_defaults)
            .collect();
        self
    }

    /// Find a category by name
    pub fn category(&self, name: &str) -> Option<&ProducerManagerConfig> {
        self.categories.iter().find(|c| c.category == name)
    }
}

/// Configuration of one Producer Manager
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProducerManagerConfig {
    /// Traffic category name (registry key)
    #[validate(length(min = 1, message = "category cannot be empty"))]
    pub category: String,

    /// Lookup node configurations
    #[serde(default, alias = "producerConfigs")]
    #[validate(length(min = 1, message = "at least one lookup address is required"))]
    pub producer_configs: Vec<ProducerConfig>,

    /// Producer clients created per discovered broker node
    #[serde(default = "default_pool_size", alias = "poolSize", alias = "PoolSize")]
    #[validate(range(min = 1, message = "pool_size must be >= 1"))]
    pub pool_size: usize,

    /// Lookup query timeout in milliseconds (0 = default)
    #[serde(default)]
    pub lookup_timeout_ms: u64,

    /// Periodic re-discovery interval in seconds (None = discover at construction only)
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,

    /// Collapse broker nodes reported by several lookups into one entry
    #[serde(default)]
    pub dedupe_nodes: bool,
}

fn default_pool_size() -> usize {
    1
}

impl ProducerManagerConfig {
    /// Create a config for `category` looking up through `lookups`
    pub fn new<I, S>(category: impl Into<String>, lookups: I, pool_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category: category.into(),
            producer_configs: lookups
                .into_iter()
                .map(|addr| ProducerConfig {
                    address: addr.into(),
                    ..ProducerConfig::default()
                })
                .collect(),
            pool_size,
            lookup_timeout_ms: 0,
            refresh_interval_secs: None,
            dedupe_nodes: false,
        }
    }

    /// Fill zero-valued fields
    pub fn with_defaults(mut self) -> Self {
        if self.lookup_timeout_ms == 0 {
            self.lookup_timeout_ms = DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64;
        }
        self.producer_configs = self
            .producer_configs
            .into_iter()
            .map(ProducerConfig::with_defaults)
            .collect();
        self
    }

    /// Lookup addresses in configuration order
    pub fn lookup_addresses(&self) -> Vec<String> {
        self.producer_configs
            .iter()
            .map(|c| c.address.clone())
            .collect()
    }

    /// Lookup query timeout
    pub fn lookup_timeout(&self) -> Duration {
        non_zero_ms(self.lookup_timeout_ms, DEFAULT_LOOKUP_TIMEOUT)
    }

    /// Periodic refresh interval, if configured
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Connection settings applied to every client of this category
    ///
    /// Taken from the first producer config; lookups of one category share them.
    pub fn client_config(&self) -> ProducerConfig {
        self.producer_configs
            .first()
            .cloned()
            .unwrap_or_default()
            .with_defaults()
    }
}

/// Per-node producer settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Abort manager construction when a client cannot be created
    #[serde(default)]
    pub fail_on_conn_err: bool,

    /// Publish queue capacity (in-flight enqueue ceiling)
    #[serde(default)]
    pub max_concurrency: usize,

    /// Node address (`host:port`)
    #[serde(default)]
    pub address: String,

    /// Default topic (informational)
    #[serde(default)]
    pub topic: String,

    /// Dial timeout in milliseconds (0 = default)
    #[serde(default)]
    pub dial_timeout_ms: u64,

    /// Read timeout in milliseconds (0 = default)
    #[serde(default)]
    pub read_timeout_ms: u64,

    /// Write timeout in milliseconds (0 = default)
    #[serde(default)]
    pub write_timeout_ms: u64,
}

impl ProducerConfig {
    /// Fill zero-valued fields once
    pub fn with_defaults(mut self) -> Self {
        if self.address.is_empty() {
            self.address = DEFAULT_ADDRESS.to_string();
        }
        if self.max_concurrency == 0 {
            self.max_concurrency = DEFAULT_MAX_CONCURRENCY;
        }
        if self.dial_timeout_ms == 0 {
            self.dial_timeout_ms = DEFAULT_DIAL_TIMEOUT.as_millis() as u64;
        }
        if self.read_timeout_ms == 0 {
            self.read_timeout_ms = DEFAULT_READ_TIMEOUT.as_millis() as u64;
        }
        if self.write_timeout_ms == 0 {
            self.write_timeout_ms = DEFAULT_WRITE_TIMEOUT.as_millis() as u64;
        }
        self
    }

    pub fn dial_timeout(&self) -> Duration {
        non_zero_ms(self.dial_timeout_ms, DEFAULT_DIAL_TIMEOUT)
    }

    pub fn read_timeout(&self) -> Duration {
        non_zero_ms(self.read_timeout_ms, DEFAULT_READ_TIMEOUT)
    }

    pub fn write_timeout(&self) -> Duration {
        non_zero_ms(self.write_timeout_ms, DEFAULT_WRITE_TIMEOUT)
    }

    /// Publish queue capacity and unacknowledged-publish ceiling, never zero
    pub fn queue_capacity(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

fn non_zero_ms(ms: u64, fallback: Duration) -> Duration {
    if ms == 0 {
        fallback
    } else {
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_config_defaults_fill_zero_fields() {
        let config = ProducerConfig::default().with_defaults();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.dial_timeout(), Duration::from_secs(5));
        assert_eq!(config.read_timeout(), Duration::from_secs(60));
        assert_eq!(config.write_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_producer_config_defaults_keep_explicit_values() {
        let config = ProducerConfig {
            address: "10.0.0.1:4161".into(),
            max_concurrency: 8,
            dial_timeout_ms: 250,
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(config.address, "10.0.0.1:4161");
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.dial_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_manager_config_accepts_original_keys() {
        let json = r#"{
            "configs": [
                {
                    "category": "orders",
                    "producerConfigs": [{ "address": "127.0.0.1:4161" }],
                    "PoolSize": 3
                }
            ]
        }"#;
        let config: ManagerConfig = serde_json::from_str(json).unwrap();
        let orders = config.category("orders").unwrap();
        assert_eq!(orders.pool_size, 3);
        assert_eq!(orders.lookup_addresses(), vec!["127.0.0.1:4161".to_string()]);
        assert!(!orders.dedupe_nodes);
    }

    #[test]
    fn test_validation_rejects_zero_pool_size() {
        let config = ProducerManagerConfig::new("orders", ["127.0.0.1:4161"], 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_missing_lookups() {
        let config = ProducerManagerConfig::new("orders", Vec::<String>::new(), 1);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("lookup"));
    }

    #[test]
    fn test_refresh_interval_zero_is_disabled() {
        let mut config = ProducerManagerConfig::new("orders", ["a:1"], 1);
        config.refresh_interval_secs = Some(0);
        assert_eq!(config.refresh_interval(), None);
        config.refresh_interval_secs = Some(30);
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(30)));
    }
}
