pub mod analytics;
pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod diagnostic;
pub mod display;
pub mod error;
pub mod health;
pub mod models;
pub mod notice;
pub mod patients;
pub mod upload;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub fn run() -> ExitCode {
    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();
    let service_config = config::ServiceConfig::from_env();
    tracing::debug!("{} v{} starting", config::APP_NAME, config::APP_VERSION);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut out = cli::Output::new(cli.json);
    match runtime.block_on(cli::execute(cli, &service_config, &mut out)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            if !out.surfaced() {
                match &e {
                    cli::CliError::Client(client) => eprintln!("error: {}", client.user_message()),
                    other => eprintln!("error: {other}"),
                }
            }
            ExitCode::FAILURE
        }
    }
}
