#![warn(clippy::all, clippy::pedantic)]

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nodecheck::resources::platform_probe;
use nodecheck::{AssessmentExecutor, Config, MonitorLoop};
use tracing::{error, warn};

mod cli;
mod report;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logger::init_with_level(cli.log_level());

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config_path = Config::resolve_path(cli.config.as_ref())?;
    let config = cli.apply(Config::from_config(Some(&config_path))?);
    config.validate()?;

    if cli.init_config {
        config.write_config(&config_path)?;
        println!("Wrote {}", config_path.display());
        print!("{config}");
        return Ok(0);
    }

    let renderer = report::select(cli.json, cli.no_color);
    let mut executor =
        AssessmentExecutor::from_config(&config).context("failed to set up the HTTP client")?;
    if !cli.no_system_check {
        executor = executor.with_resource_probe(platform_probe());
    }

    let Some(interval) = config.monitor.interval() else {
        return tokio::select! {
            result = executor.run_cycle() => {
                println!("{}", renderer.render(&result)?);
                Ok(result.exit_code())
            }
            () = interrupted() => {
                warn!("Interrupted, no report produced");
                Ok(1)
            }
        };
    };

    eprintln!("Monitor mode: checking every {}s, press Ctrl+C to stop", interval.as_secs());
    let monitor = MonitorLoop::new(Arc::new(executor), interval);

    monitor
        .run(interrupted(), |result| match renderer.render(&result) {
            Ok(text) => println!("{text}"),
            Err(error) => error!("Failed to render report: {error:#}"),
        })
        .await;

    eprintln!("Monitoring stopped");
    Ok(1)
}

/// Resolves on Ctrl+C. Without a signal handler this never resolves, so a
/// failed registration cannot be mistaken for an interrupt.
async fn interrupted() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {error}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_interrupted_waits_for_a_signal() {
        let waited = tokio::time::timeout(Duration::from_millis(50), interrupted()).await;
        assert!(waited.is_err());
    }
}
