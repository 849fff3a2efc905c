//! Command-line interface for the `orders` binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use common::OrderId;
use event_store::{EventRecord, EventStore};

use crate::{AppError, Config, Consistency, OrderApp};

#[derive(Debug, Parser)]
#[command(name = "orders", about = "Event-sourced order management", version)]
pub struct Cli {
    /// Event log file. Overrides ORDERS_LOG_PATH.
    #[arg(long = "log-path", global = true)]
    pub log_path: Option<PathBuf>,

    /// Read consistency after a command. Overrides ORDERS_CONSISTENCY.
    #[arg(long = "consistency", global = true, value_enum)]
    pub consistency: Option<Consistency>,

    /// Print Prometheus metrics after the command output.
    #[arg(long = "metrics", global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create an order and print its id
    Create {
        customer_id: String,
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// Mark an order as paid
    Pay { order_id: OrderId },
    /// Cancel an order
    Cancel {
        order_id: OrderId,
        #[arg(long = "reason", default_value = "")]
        reason: String,
    },
    /// Print one order as JSON
    Get { order_id: OrderId },
    /// Print every order as JSON, one per line
    List,
    /// Print the event log, one record per line
    Events,
}

impl Cli {
    /// Applies command-line overrides on top of environment configuration.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(path) = &self.log_path {
            config = config.with_log_path(path);
        }
        if let Some(consistency) = self.consistency {
            config = config.with_consistency(consistency);
        }
        config
    }
}

/// Executes one command against the log described by `config` and returns
/// the text to print.
pub async fn run(command: Commands, config: &Config) -> Result<String, AppError> {
    let app = OrderApp::open(config).await?;

    let output = match command {
        Commands::Create { customer_id, items } => {
            app.create_order(customer_id, items).await?.to_string()
        }
        Commands::Pay { order_id } => {
            app.pay_order(order_id).await?;
            format!("order {order_id} paid")
        }
        Commands::Cancel { order_id, reason } => {
            app.cancel_order(order_id, reason).await?;
            format!("order {order_id} cancelled")
        }
        Commands::Get { order_id } => {
            app.catch_up().await?;
            let order = app
                .get_order(order_id)
                .await
                .ok_or(AppError::NotFound(order_id))?;
            serde_json::to_string_pretty(&order)?
        }
        Commands::List => {
            app.catch_up().await?;
            app.get_all_orders()
                .await
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?
                .join("\n")
        }
        Commands::Events => app
            .store()
            .all_events()
            .await?
            .iter()
            .map(|event| serde_json::to_string(&EventRecord::from(event)))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from(["orders", "create", "alice", "book", "pen"]).unwrap();
        match cli.command {
            Commands::Create { customer_id, items } => {
                assert_eq!(customer_id, "alice");
                assert_eq!(items, vec!["book", "pen"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_create_requires_items() {
        assert!(Cli::try_parse_from(["orders", "create", "alice"]).is_err());
    }

    #[test]
    fn test_order_id_must_be_positive() {
        assert!(Cli::try_parse_from(["orders", "pay", "0"]).is_err());
        assert!(Cli::try_parse_from(["orders", "pay", "abc"]).is_err());
    }

    #[test]
    fn test_global_flags_override_config() {
        let cli = Cli::try_parse_from([
            "orders",
            "list",
            "--log-path",
            "/tmp/x.jsonl",
            "--consistency",
            "eventual",
            "--metrics",
        ])
        .unwrap();
        assert!(cli.metrics);

        let config = cli.apply(Config::default());
        assert_eq!(config.log_path, PathBuf::from("/tmp/x.jsonl"));
        assert_eq!(config.consistency, Consistency::Eventual);
    }

    #[test]
    fn test_cancel_reason_defaults_to_empty() {
        let cli = Cli::try_parse_from(["orders", "cancel", "3"]).unwrap();
        match cli.command {
            Commands::Cancel { order_id, reason } => {
                assert_eq!(order_id.as_u64(), 3);
                assert!(reason.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
