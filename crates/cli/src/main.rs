//! # brokerctl
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - broker 节点发现
//! - topic / channel 管理与消息发布

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use observability::{LogFormat, ObservabilityConfig};
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_channel, run_discover, run_info, run_publish, run_topic, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "brokerctl starting");

    // Execute command
    let result = match &cli.command {
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Discover(args) => run_discover(args).await,
        Commands::Topic(command) => run_topic(command).await,
        Commands::Channel(command) => run_channel(command).await,
        Commands::Publish(args) => run_publish(args).await,
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    Ok(result?)
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let format = match cli.log_format {
        cli::LogFormat::Json => LogFormat::Json,
        cli::LogFormat::Pretty => LogFormat::Pretty,
        cli::LogFormat::Compact => LogFormat::Compact,
    };
    let config = ObservabilityConfig::from_verbosity(cli.verbose, cli.quiet).with_format(format);

    observability::init_with_config(config)
}
