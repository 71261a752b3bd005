//! Cluster fact collection.
//!
//! Two sources feed one [`RawSnapshot`]: `ceph -s --format json` (health
//! string, check identifiers, OSD counters, monitor quorum) and Prometheus
//! instant queries (placement-group counters). Counter values are forwarded
//! as the raw strings the source produced; parsing them is the normalizer's
//! job, so a bad value is reported against its field instead of vanishing
//! into transport code.
//!
//! Failure policy: a source that cannot be reached, exits non-zero, or
//! returns a broken envelope is [`RcaError::CollectorUnavailable`] and aborts
//! the run. A metric that is merely absent (empty query result) is a valid
//! answer and becomes an estimated zero downstream.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use rca_common::config::{CephConfig, PrometheusConfig, RcaConfig};
use rca_common::{RawSnapshot, RcaError};

/// Prometheus queries, aggregated server-side so at most one sample returns.
const QUERY_PG_DEGRADED: &str = "sum(ceph_pg_degraded)";
const QUERY_PG_UNDERSIZED: &str = "sum(ceph_pg_undersized)";
const QUERY_PG_UNASSIGNED: &str = "sum(ceph_pg_unknown)";
const QUERY_PG_DOWN: &str = "sum(ceph_pg_down)";

/// Collects one snapshot from both sources. The capture timestamp is stamped
/// here, once.
pub async fn collect_snapshot(
    config: &RcaConfig,
    http: &reqwest::Client,
) -> Result<RawSnapshot, RcaError> {
    let status = fetch_ceph_status(&config.ceph).await?;

    let mut raw = RawSnapshot::empty(Utc::now());
    apply_ceph_status(&mut raw, &status);

    raw.pg_degraded = prometheus_value(http, &config.prometheus, QUERY_PG_DEGRADED).await?;
    raw.pg_undersized = prometheus_value(http, &config.prometheus, QUERY_PG_UNDERSIZED).await?;
    raw.pg_unassigned = prometheus_value(http, &config.prometheus, QUERY_PG_UNASSIGNED).await?;
    raw.pg_down = prometheus_value(http, &config.prometheus, QUERY_PG_DOWN).await?;

    Ok(raw)
}

// ---------------------------------------------------------------------------
// Ceph status
// ---------------------------------------------------------------------------

/// Typed partial view of `ceph -s --format json`. Unknown keys are ignored;
/// counters stay as JSON values so oddities reach the normalizer as raw text.
#[derive(Debug, Default, Deserialize)]
struct CephStatus {
    #[serde(default)]
    health: CephHealth,
    #[serde(default)]
    osdmap: CephOsdMap,
    #[serde(default)]
    monmap: CephMonMap,
    quorum: Option<Vec<u64>>,
}

#[derive(Debug, Default, Deserialize)]
struct CephHealth {
    status: Option<String>,
    #[serde(default)]
    checks: serde_json::Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct CephOsdMap {
    num_osds: Option<Value>,
    num_up_osds: Option<Value>,
    num_in_osds: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct CephMonMap {
    num_mons: Option<u64>,
}

/// Argument vector for the status call, shaped by deployment config.
fn status_command(config: &CephConfig) -> Vec<String> {
    let mut argv = Vec::new();
    if config.sudo {
        argv.push("sudo".to_string());
    }
    if config.cephadm {
        argv.extend(["cephadm", "shell", "--"].map(String::from));
    }
    argv.extend(["ceph", "-s", "--format", "json"].map(String::from));
    argv
}

async fn fetch_ceph_status(config: &CephConfig) -> Result<CephStatus, RcaError> {
    let argv = status_command(config);
    run_status_command(&argv, config.status_timeout_secs).await
}

/// Runs the status argv under a whole-call deadline. A hung command is a
/// collector failure; the child is killed when the call is abandoned.
async fn run_status_command(argv: &[String], timeout_secs: u64) -> Result<CephStatus, RcaError> {
    debug!("Running {}", argv.join(" "));

    let output = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        Command::new(&argv[0])
            .args(&argv[1..])
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| {
        RcaError::CollectorUnavailable(format!(
            "'{}' timed out after {}s",
            argv.join(" "),
            timeout_secs
        ))
    })?
    .map_err(|e| {
        RcaError::CollectorUnavailable(format!("failed to run '{}': {}", argv.join(" "), e))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RcaError::CollectorUnavailable(format!(
            "'{}' exited with {}: {}",
            argv.join(" "),
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        return Err(RcaError::CollectorUnavailable(format!(
            "'{}' produced no output",
            argv.join(" ")
        )));
    }
    parse_ceph_status(&stdout)
}

fn parse_ceph_status(payload: &str) -> Result<CephStatus, RcaError> {
    serde_json::from_str(payload).map_err(|e| {
        RcaError::CollectorUnavailable(format!("unparseable ceph status output: {}", e))
    })
}

fn apply_ceph_status(raw: &mut RawSnapshot, status: &CephStatus) {
    raw.health_status = status.health.status.clone();
    raw.health_checks = status.health.checks.keys().cloned().collect();
    raw.osds_up = status.osdmap.num_up_osds.as_ref().map(raw_value_string);
    raw.osds_in = status.osdmap.num_in_osds.as_ref().map(raw_value_string);
    raw.osds_total = status.osdmap.num_osds.as_ref().map(raw_value_string);
    raw.mon_quorum = quorum_state(status);
}

/// JSON value as the raw string the normalizer will parse. Strings pass
/// through unquoted; anything else keeps its JSON rendering, which the
/// normalizer rejects with the field name if it is not numeric.
fn raw_value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Quorum holds when the quorum member list reaches a monitor majority.
/// Unknown when the status carries no monitor count or no quorum list at
/// all; an absent list is not evidence of lost quorum.
fn quorum_state(status: &CephStatus) -> Option<bool> {
    let num_mons = status.monmap.num_mons?;
    if num_mons == 0 {
        return None;
    }
    let quorum = status.quorum.as_ref()?;
    Some(quorum.len() as u64 >= num_mons / 2 + 1)
}

// ---------------------------------------------------------------------------
// Prometheus
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PromEnvelope {
    status: String,
    #[serde(default)]
    data: PromData,
}

#[derive(Debug, Default, Deserialize)]
struct PromData {
    #[serde(default)]
    result: Vec<PromSample>,
}

/// Instant-vector sample: `value` is `[timestamp, "<number as string>"]`.
#[derive(Debug, Deserialize)]
struct PromSample {
    value: (f64, String),
}

async fn prometheus_value(
    http: &reqwest::Client,
    config: &PrometheusConfig,
    query: &str,
) -> Result<Option<String>, RcaError> {
    let response = http
        .get(config.query_endpoint())
        .query(&[("query", query)])
        .timeout(Duration::from_secs(config.query_timeout_secs))
        .send()
        .await
        .map_err(|e| {
            RcaError::CollectorUnavailable(format!("prometheus query '{}' failed: {}", query, e))
        })?;

    if !response.status().is_success() {
        return Err(RcaError::CollectorUnavailable(format!(
            "prometheus query '{}' returned {}",
            query,
            response.status()
        )));
    }

    let body = response.text().await.map_err(|e| {
        RcaError::CollectorUnavailable(format!(
            "prometheus query '{}' body unreadable: {}",
            query, e
        ))
    })?;
    parse_prometheus_value(&body, query)
}

/// `Ok(None)` means the metric had no sample: valid, estimated zero
/// downstream. A malformed envelope means the collaborator broke.
fn parse_prometheus_value(body: &str, query: &str) -> Result<Option<String>, RcaError> {
    let envelope: PromEnvelope = serde_json::from_str(body).map_err(|e| {
        RcaError::CollectorUnavailable(format!(
            "prometheus query '{}' returned an invalid envelope: {}",
            query, e
        ))
    })?;
    if envelope.status != "success" {
        return Err(RcaError::CollectorUnavailable(format!(
            "prometheus query '{}' ended with status '{}'",
            query, envelope.status
        )));
    }
    Ok(envelope
        .data
        .result
        .first()
        .map(|sample| sample.value.1.clone()))
}
