//! `discover` command implementation.

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use producer::LookupClient;

use crate::cli::DiscoverArgs;
use crate::error::Result;

#[derive(Serialize)]
struct CategoryNodes {
    category: String,
    nodes: Vec<NodeInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed_lookups: Vec<FailedLookup>,
}

#[derive(Serialize)]
struct NodeInfo {
    tcp: String,
    http: String,
}

#[derive(Serialize)]
struct FailedLookup {
    lookup: String,
    error: String,
}

/// Execute the `discover` command
pub async fn run_discover(args: &DiscoverArgs) -> Result<()> {
    let config = super::load_config(&args.config.config)?;
    let config = super::select_categories(config, args.category.as_deref())?;

    let mut results = Vec::with_capacity(config.categories.len());
    for category in &config.categories {
        info!(
            category = %category.category,
            lookups = category.producer_configs.len(),
            "Discovering broker nodes"
        );
        let client = LookupClient::new(category.lookup_timeout())?;
        let report = client
            .discover(&category.lookup_addresses(), category.dedupe_nodes)
            .await;

        results.push(CategoryNodes {
            category: category.category.clone(),
            nodes: report
                .nodes
                .iter()
                .map(|n| NodeInfo {
                    tcp: n.tcp.clone(),
                    http: n.http.clone(),
                })
                .collect(),
            failed_lookups: report
                .failures
                .iter()
                .map(|f| FailedLookup {
                    lookup: f.lookup.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        });
    }

    if args.json {
        let json = serde_json::to_string_pretty(&results)
            .context("Failed to serialize discovery result")?;
        println!("{}", json);
    } else {
        print_results(&results);
    }

    Ok(())
}

fn print_results(results: &[CategoryNodes]) {
    for result in results {
        println!("📦 {} ({} nodes)", result.category, result.nodes.len());
        for node in &result.nodes {
            println!("   ├─ {} (http {})", node.tcp, node.http);
        }
        for failed in &result.failed_lookups {
            println!("   ⚠ {}: {}", failed.lookup, failed.error);
        }
        println!();
    }
}
