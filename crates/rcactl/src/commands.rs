//! Subcommand implementations.
//!
//! `report` is the full single-shot pipeline: collect, normalize, classify,
//! score, narrate, write. `assess` stops after scoring and `facts` after
//! normalization; both exist so operators can sanity-check collection without
//! spending an LLM call.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use rca_common::narrative::{fallback_sections, Narrative, NarrativeGenerator, NarrativeSource};
use rca_common::report::{format_markdown, format_text};
use rca_common::{
    assess_risk, classify, normalize, ClusterFacts, IncidentCategory, RcaConfig, RcaResult,
    RiskAssessment, RiskLevel,
};

use crate::collectors;
use crate::groq::GroqClient;

pub struct ReportArgs {
    pub output_dir: Option<PathBuf>,
    pub force: bool,
    pub stdout: bool,
    pub plain: bool,
}

/// Full pipeline. Exactly one snapshot, one classification, at most one
/// narrative call; a healthy verdict short-circuits before the LLM is
/// touched unless forced.
pub async fn run_report(config: &RcaConfig, args: ReportArgs) -> Result<()> {
    // With --stdout the report itself owns stdout, so progress is silenced.
    let quiet = args.stdout || args.plain;
    let http = reqwest::Client::new();

    step(quiet, 1, "Collecting cluster state (ceph + prometheus)...");
    let raw = collectors::collect_snapshot(config, &http).await?;

    step(quiet, 2, "Normalizing facts...");
    let facts = normalize(&raw)?;

    step(quiet, 3, "Classifying and scoring...");
    let category = classify(&facts);
    let risk = assess_risk(&facts);
    if !quiet {
        print_verdict(category, &risk);
    }

    if skip_healthy_report(category, args.force, config) {
        info!("Cluster healthy, skipping report");
        // No report owns stdout on this path; the verdict prints even
        // under --stdout.
        if quiet {
            print_verdict(category, &risk);
        }
        println!("{} Cluster healthy. No report generated.", "✓".green());
        return Ok(());
    }

    step(quiet, 4, "Generating narrative...");
    let narrative = match GroqClient::from_config(&config.llm) {
        Ok(client) => {
            NarrativeGenerator::new(Arc::new(client))
                .generate(&facts, category, &risk)
                .await
        }
        Err(e) => {
            warn!(
                "Narrative generation unavailable, using deterministic fallback: {}",
                e
            );
            Narrative {
                sections: fallback_sections(&facts, category, &risk),
                source: NarrativeSource::Fallback,
            }
        }
    };

    let result = RcaResult::assemble(facts, category, risk, narrative);

    if quiet {
        let rendered = if args.plain {
            format_text(&result)
        } else {
            format_markdown(&result)
        };
        println!("{}", rendered);
        return Ok(());
    }

    step(quiet, 5, "Writing report...");
    let dir = args
        .output_dir
        .unwrap_or_else(|| config.report.output_dir.clone());
    let path = write_report(&dir, &format_markdown(&result))?;
    println!("{} RCA report written: {}", "✓".green(), path.display());
    Ok(())
}

/// Classify and score without touching the narrative collaborator.
pub async fn run_assess(config: &RcaConfig, json: bool) -> Result<()> {
    let http = reqwest::Client::new();
    let raw = collectors::collect_snapshot(config, &http).await?;
    let facts = normalize(&raw)?;
    let category = classify(&facts);
    let risk = assess_risk(&facts);

    if json {
        #[derive(Serialize)]
        struct Assessment<'a> {
            facts: &'a ClusterFacts,
            category: IncidentCategory,
            risk: &'a RiskAssessment,
        }
        let assessment = Assessment {
            facts: &facts,
            category,
            risk: &risk,
        };
        println!("{}", serde_json::to_string_pretty(&assessment)?);
        return Ok(());
    }

    println!("{}", category.summary());
    print_verdict(category, &risk);
    for reason in &risk.reasons {
        println!("  - {}", reason);
    }
    Ok(())
}

/// Collect and normalize only, printing the facts as JSON.
pub async fn run_facts(config: &RcaConfig) -> Result<()> {
    let http = reqwest::Client::new();
    let raw = collectors::collect_snapshot(config, &http).await?;
    let facts = normalize(&raw)?;
    println!("{}", serde_json::to_string_pretty(&facts)?);
    Ok(())
}

/// A healthy classification ends the run without a file unless overridden by
/// `--force` or `report.write_on_healthy`.
fn skip_healthy_report(category: IncidentCategory, force: bool, config: &RcaConfig) -> bool {
    category == IncidentCategory::NoIncident && !(force || config.report.write_on_healthy)
}

fn step(quiet: bool, n: usize, message: &str) {
    if !quiet {
        println!("{} {}", format!("[{}/5]", n).dimmed(), message);
    }
}

fn verdict_line(category: IncidentCategory, risk: &RiskAssessment) -> String {
    let level = match risk.level {
        RiskLevel::High => risk.level.as_str().red().bold().to_string(),
        RiskLevel::Medium => risk.level.as_str().yellow().bold().to_string(),
        RiskLevel::Low => risk.level.as_str().green().bold().to_string(),
    };
    format!("{} | risk {} (score {})", category, level, risk.score)
}

fn print_verdict(category: IncidentCategory, risk: &RiskAssessment) {
    println!("{}", verdict_line(category, risk));
}

/// Writes the report atomically: content lands in a hidden temp file in the
/// target directory, then a rename publishes it. File names carry a
/// timestamp plus a random suffix, so concurrent runs never collide.
pub fn write_report(dir: &Path, markdown: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {}", dir.display()))?;

    let id = Uuid::new_v4().simple().to_string();
    let short = &id[..8];
    let file_name = format!("ceph-rca-{}-{}.md", Utc::now().format("%Y%m%d-%H%M%S"), short);

    let tmp = dir.join(format!(".{}.tmp", file_name));
    let path = dir.join(&file_name);

    fs::write(&tmp, markdown)
        .with_context(|| format!("Failed to write report to {}", tmp.display()))?;
    fs::rename(&tmp, &path)
        .with_context(|| format!("Failed to publish report at {}", path.display()))?;

    Ok(path)
}
