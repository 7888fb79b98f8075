//! `validate` command implementation.

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use contracts::ManagerConfig;

use crate::cli::ValidateArgs;
use crate::error::{CliError, Result};

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    category_count: usize,
    lookup_count: usize,
    categories: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Configuration validation failed").into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.config.display().to_string();

    match super::load_config(&args.config.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    category_count: config.categories.len(),
                    lookup_count: config
                        .categories
                        .iter()
                        .map(|c| c.producer_configs.len())
                        .sum(),
                    categories: config
                        .categories
                        .iter()
                        .map(|c| c.category.clone())
                        .collect(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(match e {
                CliError::ConfigLoad { source, .. } => source.to_string(),
                other => other.to_string(),
            }),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ManagerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for category in &config.categories {
        // Duplicate lookups report the same nodes twice
        let lookups = category.lookup_addresses();
        let mut unique = lookups.clone();
        unique.sort();
        unique.dedup();
        if unique.len() != lookups.len() && !category.dedupe_nodes {
            warnings.push(format!(
                "Category '{}' lists a lookup twice - its nodes get double pool weight",
                category.category
            ));
        }

        if category.producer_configs.len() > 1 {
            let first = &category.producer_configs[0];
            let differs = category.producer_configs[1..].iter().any(|p| {
                p.fail_on_conn_err != first.fail_on_conn_err
                    || p.max_concurrency != first.max_concurrency
                    || p.dial_timeout_ms != first.dial_timeout_ms
            });
            if differs {
                warnings.push(format!(
                    "Category '{}' has differing producer settings - only the first entry applies",
                    category.category
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Categories: {}", summary.category_count);
            println!("  Lookups: {}", summary.lookup_count);
            for category in &summary.categories {
                println!("    - {}", category);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ConfigArgs;
    use std::io::Write;

    fn args_for(content: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: ConfigArgs {
                config: file.path().to_path_buf(),
            },
            json: false,
        };
        (file, args)
    }

    #[test]
    fn test_duplicate_lookup_warns() {
        let (_file, args) = args_for(
            r#"
[[categories]]
category = "orders"
[[categories.producer_configs]]
address = "lookup-a:4161"
[[categories.producer_configs]]
address = "lookup-a:4161"
"#,
        );
        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings[0].contains("double pool weight"));
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let (_file, args) = args_for("[[categories]]\ncategory = \"orders\"\n");
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("at least one lookup address"));
    }
}
