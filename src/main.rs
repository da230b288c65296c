//! # Ocean Report Entry Point
//!
//! Runs a single daily report and exits. Scheduling is left to cron, systemd timers
//! or similar. By default the composed message is printed to stdout; pass `--send`
//! (or set `RUN_EMAIL=true`) to deliver it.
//!
//! ## Environment variables
//!
//! | Variable              | Description                                   |
//! |-----------------------|-----------------------------------------------|
//! | `OCEAN_REPORT_CONFIG` | Config file path (default `ocean-report.toml`) |
//! | `RUN_EMAIL`           | Send the email instead of printing it         |
//! | `TEST`                | Use the test recipient list                   |
//! | `RUST_LOG`            | Log filter (default `info`)                   |

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::{error, info};

use ocean_report_lib::config::{Config, DEFAULT_CONFIG_PATH};
use ocean_report_lib::fetcher::ResilientFetcher;
use ocean_report_lib::orchestrator::{ReportOrchestrator, RunOptions, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "ocean-report", about = "Daily ocean conditions email report")]
struct CliArgs {
    /// Path to the TOML configuration file
    #[arg(long, env = "OCEAN_REPORT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Send the email (dry run prints it instead)
    #[arg(long, env = "RUN_EMAIL", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    send: bool,

    /// Use the test recipient list and prefix the subject with "TEST:"
    #[arg(long, env = "TEST", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    test: bool,
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    info!("Starting ocean report");

    // Configuration problems are fatal before any network I/O
    let config = Config::load_from_path(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let fetcher = ResilientFetcher::from_config(&config.http).context("building HTTP client")?;

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(async {
        ReportOrchestrator::new(&config, fetcher)
            .run(RunOptions {
                send: args.send,
                test_mode: args.test,
                today: None,
            })
            .await
    });

    match outcome {
        Ok(RunOutcome::Sent { recipients }) => {
            info!(recipients, "Report sent");
            println!("Email sent!");
            Ok(())
        }
        Ok(RunOutcome::Printed(message)) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            error!(error = %err, "Report run failed");
            Err(err.into())
        }
    }
}
