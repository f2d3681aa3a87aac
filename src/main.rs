mod api;
mod cli;
mod client;
mod error;
mod events;
mod kubeconfig;
mod models;
mod probe;
mod reconcile;
mod report;
mod values;
mod waiter;

use api::PipelineApi;
use clap::Parser;
use cli::{Cli, LogFormat};
use client::HttpTransport;
use colored::*;
use error::Result;
use reconcile::Plugin;
use report::RunReport;
use std::process::ExitCode;
use tracing::{error, info, Dispatch};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let dispatch = log_dispatch(&cli.log_level, cli.log_format);
    tracing::dispatcher::with_default(&dispatch, || run(&cli))
}

fn run(cli: &Cli) -> ExitCode {
    info!("start executing step interacting with pipeline");
    match execute(cli) {
        Ok(report) => {
            println!("{}", report.render());
            println!("{}", "OK".bold().green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "step failed");
            eprintln!("{} {}", "FAILED".bold().red(), e);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<RunReport> {
    let env = values::plugin_env(std::env::vars());
    let deployment = cli.deployment_spec(&env)?;
    let transport = HttpTransport::new(cli.credentials(), cli.request_timeout())?;
    let api = PipelineApi::new(Box::new(transport), cli.endpoint()?, cli.probe_policy())?;

    let mut plugin = Plugin::new(api, cli.cluster_spec(), deployment, cli.settings())
        .with_waiter(cli.waiter());
    plugin.exec()
}

/// `RUST_LOG` wins over the configured level when set.
fn log_dispatch(level: &str, format: LogFormat) -> Dispatch {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => Dispatch::new(builder.finish()),
        LogFormat::Json => Dispatch::new(builder.json().finish()),
    }
}

fn filter_directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        "" => "info".to_string(),
        "warning" => "warn".to_string(),
        "fatal" | "panic" => "error".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_directive_maps_level_aliases() {
        assert_eq!(filter_directive("DEBUG"), "debug");
        assert_eq!(filter_directive("warning"), "warn");
        assert_eq!(filter_directive("panic"), "error");
        assert_eq!(filter_directive(" "), "info");
    }

    #[test]
    fn execute_fails_fast_without_endpoint() {
        // Arrange
        let mut cli = Cli::defaults();
        cli.cluster_name = "demo".to_string();

        // Act
        let result = execute(&cli);

        // Assert
        assert!(matches!(result, Err(error::Error::Validation { .. })));
    }
}
