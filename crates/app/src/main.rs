//! `orders` command-line entry point.

use std::process::ExitCode;

use clap::Parser;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use order_app::cli::{self, Cli};
use order_app::{AppError, Config};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.apply(Config::from_env());

    // Logs go to stderr so command output stays pipeable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match execute(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn execute(cli: Cli, config: &Config) -> Result<(), AppError> {
    let metrics_handle = if cli.metrics {
        Some(install_recorder()?)
    } else {
        None
    };

    let output = cli::run(cli.command, config).await?;
    if !output.is_empty() {
        println!("{output}");
    }

    if let Some(handle) = metrics_handle {
        print!("{}", handle.render());
    }
    Ok(())
}

fn install_recorder() -> Result<PrometheusHandle, AppError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|err| AppError::Setup(err.to_string()))
}
