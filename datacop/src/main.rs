// datacop/src/main.rs
//! DataCop runner entry point.
//!
//! Reads one trigger event, builds the cloud context once, and drives a
//! single remediation execution to its terminal state.

use anyhow::{Context, Result};
use clap::Parser;
use datacop_core::{CloudContext, RemediationConfig, WorkflowOrchestrator};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "datacop", author, version, about)]
struct Cli {
    /// Path to the trigger event JSON; reads stdin when omitted
    #[arg(long, short = 'e')]
    event: Option<PathBuf>,

    /// Suppress internal logging
    #[arg(long, short = 'q', default_value_t = false)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.quiet {
        builder.filter_level(log::LevelFilter::Off);
    }
    builder.init();

    let raw = match &args.event {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading trigger event from '{}'", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading trigger event from stdin")?;
            buffer
        }
    };
    let trigger: serde_json::Value =
        serde_json::from_str(&raw).context("trigger event is not valid JSON")?;

    let config = RemediationConfig::from_env();
    let cloud = CloudContext::from_env().await;

    let report = WorkflowOrchestrator::new(&cloud, &config)
        .run(&trigger)
        .await
        .context("remediation execution failed")?;

    println!(
        "execution {} finished in state {}",
        report.context.execution_id, report.terminal_state
    );
    if let Some(notification) = &report.notification {
        println!("report delivered: {}", notification.delivery_id);
    }

    Ok(())
}
