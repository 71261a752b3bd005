//! rcactl - Ceph RCA report generator
//!
//! Collects point-in-time cluster health from Ceph and Prometheus,
//! classifies the situation, scores failure risk, and emits a
//! root-cause-analysis report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use rca_common::RcaConfig;
use rcactl::commands::{self, ReportArgs};

#[derive(Parser)]
#[command(name = "rcactl")]
#[command(about = "Ceph RCA report generator", version)]
struct Cli {
    /// Config file path (default: /etc/ceph-rca/config.toml, then ./ceph-rca.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and emit an RCA report
    Report {
        /// Directory to write the report into (overrides config)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Produce a report even when the cluster is healthy
        #[arg(long)]
        force: bool,

        /// Print the report to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,

        /// With --stdout, render plain text instead of markdown
        #[arg(long, requires = "stdout")]
        plain: bool,
    },

    /// Classify and score the cluster without generating a narrative
    Assess {
        /// Print the assessment as JSON
        #[arg(long)]
        json: bool,
    },

    /// Collect and normalize cluster facts, printed as JSON
    Facts,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `report --stdout` stays clean markdown.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RcaConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    info!("rcactl v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Report {
            output_dir,
            force,
            stdout,
            plain,
        } => {
            commands::run_report(
                &config,
                ReportArgs {
                    output_dir,
                    force,
                    stdout,
                    plain,
                },
            )
            .await
        }
        Commands::Assess { json } => commands::run_assess(&config, json).await,
        Commands::Facts => commands::run_facts(&config).await,
    }
}
