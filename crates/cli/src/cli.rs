//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// brokerctl - producer pool tooling for lookup-discovered message brokers
#[derive(Parser, Debug)]
#[command(
    name = "brokerctl",
    author,
    version,
    about = "Broker producer pool tooling",
    long_about = "Loads a producer pool configuration, discovers broker nodes through the \n\
                  configured lookup services, publishes messages and manages topics \n\
                  and channels across every discovered node."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BROKERCTL_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BROKERCTL_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file without connecting
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Query the lookup services and list discovered broker nodes
    Discover(DiscoverArgs),

    /// Create or delete a topic on every broker node of a category
    #[command(subcommand)]
    Topic(TopicCommand),

    /// Create or delete a channel on every broker node of a category
    #[command(subcommand)]
    Channel(ChannelCommand),

    /// Publish messages through a category's producer pool
    Publish(PublishArgs),
}

/// Configuration file location, shared by every command
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "brokers.toml", env = "BROKERCTL_CONFIG")]
    pub config: PathBuf,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-lookup producer settings
    #[arg(long)]
    pub producers: bool,
}

/// Arguments for the `discover` command
#[derive(Parser, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Only this category (default: all)
    #[arg(long)]
    pub category: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// `topic` subcommands
#[derive(Subcommand, Debug)]
pub enum TopicCommand {
    /// Create a topic
    Create(TopicArgs),
    /// Delete a topic
    Delete(TopicArgs),
}

/// `channel` subcommands
#[derive(Subcommand, Debug)]
pub enum ChannelCommand {
    /// Create a channel
    Create(ChannelArgs),
    /// Delete a channel
    Delete(ChannelArgs),
}

/// Arguments for `topic create|delete`
#[derive(Parser, Debug)]
pub struct TopicArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Category whose broker nodes receive the request
    #[arg(long, env = "BROKERCTL_CATEGORY")]
    pub category: String,

    /// Topic name
    pub topic: String,
}

/// Arguments for `channel create|delete`
#[derive(Parser, Debug)]
pub struct ChannelArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Category whose broker nodes receive the request
    #[arg(long, env = "BROKERCTL_CATEGORY")]
    pub category: String,

    /// Topic name
    pub topic: String,

    /// Channel name
    pub channel: String,
}

/// Arguments for the `publish` command
#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Category whose producer pool publishes
    #[arg(long, env = "BROKERCTL_CATEGORY")]
    pub category: String,

    /// Topic name
    pub topic: String,

    /// Message bodies (read from stdin, one per line, when empty)
    pub messages: Vec<String>,

    /// Publish every message this many times
    #[arg(long, default_value = "1")]
    pub repeat: u32,

    /// Deliver messages after this many milliseconds (0 = immediately)
    #[arg(long, default_value = "0")]
    pub defer_ms: u64,

    /// Create the topic on every node before publishing
    #[arg(long)]
    pub create_topic: bool,

    /// Give up waiting for acknowledgements after this many seconds (0 = wait forever)
    #[arg(long, default_value = "30", env = "BROKERCTL_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BROKERCTL_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
