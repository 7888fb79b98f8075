//! `topic` / `channel` command implementations.

use tracing::{info, warn};

use producer::{AdminAction, AdminReport, HttpConnector, Registry};

use crate::cli::{ChannelArgs, ChannelCommand, ConfigArgs, TopicArgs, TopicCommand};
use crate::error::{CliError, Result};

/// Execute `topic create|delete`
pub async fn run_topic(command: &TopicCommand) -> Result<()> {
    let (args, action) = match command {
        TopicCommand::Create(args) => (args, topic_action(args, true)),
        TopicCommand::Delete(args) => (args, topic_action(args, false)),
    };
    administer(&args.config, &args.category, action).await
}

/// Execute `channel create|delete`
pub async fn run_channel(command: &ChannelCommand) -> Result<()> {
    let (args, action) = match command {
        ChannelCommand::Create(args) => (args, channel_action(args, true)),
        ChannelCommand::Delete(args) => (args, channel_action(args, false)),
    };
    administer(&args.config, &args.category, action).await
}

fn topic_action(args: &TopicArgs, create: bool) -> AdminAction {
    let topic = args.topic.clone();
    if create {
        AdminAction::CreateTopic { topic }
    } else {
        AdminAction::DeleteTopic { topic }
    }
}

fn channel_action(args: &ChannelArgs, create: bool) -> AdminAction {
    let topic = args.topic.clone();
    let channel = args.channel.clone();
    if create {
        AdminAction::CreateChannel { topic, channel }
    } else {
        AdminAction::DeleteChannel { topic, channel }
    }
}

async fn administer(config: &ConfigArgs, category: &str, action: AdminAction) -> Result<()> {
    let manager_config = super::load_config(&config.config)?;
    let manager_config = super::select_categories(manager_config, Some(category))?;

    let registry = Registry::initialize(&manager_config, HttpConnector::new()).await?;
    let result = match &action {
        AdminAction::CreateTopic { topic } => registry.create_topic(category, topic).await,
        AdminAction::DeleteTopic { topic } => registry.delete_topic(category, topic).await,
        AdminAction::CreateChannel { topic, channel } => {
            registry.create_channel(category, topic, channel).await
        }
        AdminAction::DeleteChannel { topic, channel } => {
            registry.delete_channel(category, topic, channel).await
        }
    };
    registry.shutdown().await;

    let report = result?;
    print_report(&action, &report);
    check_report(&action, &report)
}

fn print_report(action: &AdminAction, report: &AdminReport) {
    println!(
        "{}: {}/{} broker nodes accepted",
        action,
        report.succeeded(),
        report.attempted
    );
    for failure in &report.failures {
        println!("   ⚠ {}: {}", failure.node, failure.error);
    }
}

fn check_report(action: &AdminAction, report: &AdminReport) -> Result<()> {
    if report.is_complete() {
        info!(action = %action, nodes = report.attempted, "Admin request completed");
        return Ok(());
    }
    warn!(action = %action, failed = report.failures.len(), "Admin request incomplete");
    Err(CliError::AdminIncomplete {
        action: action.name().to_string(),
        failed: report.failures.len(),
        attempted: report.attempted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use producer::AdminFailure;

    #[test]
    fn test_partial_failure_is_an_error() {
        let action = AdminAction::CreateTopic {
            topic: "orders".into(),
        };
        let report = AdminReport {
            attempted: 3,
            failures: vec![AdminFailure {
                node: "b:4151".into(),
                error: ContractError::admin("b:4151", "500 Internal Server Error"),
            }],
        };

        let err = check_report(&action, &report).unwrap_err();
        assert_eq!(err.to_string(), "topic_create failed on 1 of 3 broker nodes");
        assert!(check_report(&action, &AdminReport::default()).is_ok());
    }
}
