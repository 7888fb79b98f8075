//! `info` command implementation.

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use contracts::{ManagerConfig, ProducerConfig, ProducerManagerConfig};

use crate::cli::InfoArgs;
use crate::error::Result;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    categories: Vec<CategoryInfo>,
}

#[derive(Serialize)]
struct CategoryInfo {
    category: String,
    lookups: Vec<String>,
    pool_size: usize,
    lookup_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_interval_secs: Option<u64>,
    dedupe_nodes: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    producers: Vec<ProducerInfo>,
}

#[derive(Serialize)]
struct ProducerInfo {
    address: String,
    max_concurrency: usize,
    fail_on_conn_err: bool,
    dial_timeout_ms: u64,
    read_timeout_ms: u64,
    write_timeout_ms: u64,
}

impl From<&ProducerConfig> for ProducerInfo {
    fn from(p: &ProducerConfig) -> Self {
        Self {
            address: p.address.clone(),
            max_concurrency: p.max_concurrency,
            fail_on_conn_err: p.fail_on_conn_err,
            dial_timeout_ms: p.dial_timeout_ms,
            read_timeout_ms: p.read_timeout_ms,
            write_timeout_ms: p.write_timeout_ms,
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.config.display(), "Loading configuration info");

    let config = super::load_config(&args.config.config)?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &ManagerConfig, args: &InfoArgs) -> ConfigInfo {
    let categories = config
        .categories
        .iter()
        .map(|c| CategoryInfo {
            category: c.category.clone(),
            lookups: c.lookup_addresses(),
            pool_size: c.pool_size,
            lookup_timeout_ms: c.lookup_timeout_ms,
            refresh_interval_secs: c.refresh_interval().map(|d| d.as_secs()),
            dedupe_nodes: c.dedupe_nodes,
            producers: if args.producers {
                c.producer_configs.iter().map(ProducerInfo::from).collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    ConfigInfo { categories }
}

fn print_config_info(config: &ManagerConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Broker Producer Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    for category in &config.categories {
        print_category(category, args);
    }

    println!();
}

fn print_category(category: &ProducerManagerConfig, args: &InfoArgs) {
    println!("📦 {}", category.category);
    println!("   ├─ Pool size per node: {}", category.pool_size);
    println!("   ├─ Lookup timeout: {:?}", category.lookup_timeout());
    match category.refresh_interval() {
        Some(interval) => println!("   ├─ Refresh: every {:?}", interval),
        None => println!("   ├─ Refresh: at startup only"),
    }
    println!("   ├─ Dedupe nodes: {}", category.dedupe_nodes);

    let lookups = &category.producer_configs;
    println!("   └─ Lookups ({})", lookups.len());
    for (i, producer) in lookups.iter().enumerate() {
        let is_last = i == lookups.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("      {} {}", prefix, producer.address);
        if args.producers {
            println!(
                "      {}  └─ queue {}, dial {:?}, read {:?}, write {:?}, fail_on_conn_err {}",
                child_prefix,
                producer.queue_capacity(),
                producer.dial_timeout(),
                producer.read_timeout(),
                producer.write_timeout(),
                producer.fail_on_conn_err
            );
        }
    }
    println!();
}
