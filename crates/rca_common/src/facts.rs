//! Canonical cluster fact model and the normalizer that builds it.
//!
//! Collectors hand over a [`RawSnapshot`] of raw value strings; [`normalize`]
//! turns it into an immutable [`ClusterFacts`] record. An absent counter
//! defaults to 0 and is recorded in the `estimated` set (absence is not a
//! confirmed zero). A counter that is present but unparseable fails the run:
//! a guess is never substituted for a value that was actually there.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RcaError;

/// Cluster health bucket derived from the raw status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthState {
    Ok,
    Warn,
    Error,
    Unknown,
}

impl HealthState {
    /// Case-insensitive bucketing. Anything unmatched maps to `Unknown`,
    /// never silently to `Ok`.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HEALTH_OK" | "OK" => HealthState::Ok,
            "HEALTH_WARN" | "WARN" | "WARNING" => HealthState::Warn,
            "HEALTH_ERR" | "HEALTH_ERROR" | "ERR" | "ERROR" => HealthState::Error,
            _ => HealthState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Ok => "OK",
            HealthState::Warn => "WARN",
            HealthState::Error => "ERROR",
            HealthState::Unknown => "UNKNOWN",
        }
    }
}

/// Monitor quorum state. Absent information stays `Unknown` rather than
/// being assumed healthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuorumState {
    Ok,
    Lost,
    Unknown,
}

impl QuorumState {
    pub fn from_raw(raw: Option<bool>) -> Self {
        match raw {
            Some(true) => QuorumState::Ok,
            Some(false) => QuorumState::Lost,
            None => QuorumState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuorumState::Ok => "OK",
            QuorumState::Lost => "LOST",
            QuorumState::Unknown => "UNKNOWN",
        }
    }
}

/// Identifies a counter field of [`ClusterFacts`]. Used both for the
/// estimated-field set and for naming the offending field in
/// [`RcaError::MalformedInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactField {
    OsdsUp,
    OsdsIn,
    OsdsTotal,
    PgDegraded,
    PgUndersized,
    PgUnassigned,
    PgDown,
}

impl FactField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactField::OsdsUp => "osds_up",
            FactField::OsdsIn => "osds_in",
            FactField::OsdsTotal => "osds_total",
            FactField::PgDegraded => "pg_degraded",
            FactField::PgUndersized => "pg_undersized",
            FactField::PgUnassigned => "pg_unassigned",
            FactField::PgDown => "pg_down",
        }
    }
}

/// Heterogeneous bag of raw values as delivered by the collectors.
///
/// Counters are kept as the raw strings the source produced (`None` when the
/// source had no value at all) so that parse failures are attributable to the
/// normalizer, not buried in transport code. `captured_at` is stamped once at
/// collection time, which keeps normalization idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub health_status: Option<String>,
    pub health_checks: Vec<String>,
    pub osds_up: Option<String>,
    pub osds_in: Option<String>,
    pub osds_total: Option<String>,
    pub pg_degraded: Option<String>,
    pub pg_undersized: Option<String>,
    pub pg_unassigned: Option<String>,
    pub pg_down: Option<String>,
    pub mon_quorum: Option<bool>,
    pub captured_at: DateTime<Utc>,
}

impl RawSnapshot {
    /// Snapshot with every value absent. Collector code fills fields in;
    /// tests start from here.
    pub fn empty(captured_at: DateTime<Utc>) -> Self {
        Self {
            health_status: None,
            health_checks: Vec::new(),
            osds_up: None,
            osds_in: None,
            osds_total: None,
            pg_degraded: None,
            pg_undersized: None,
            pg_unassigned: None,
            pg_down: None,
            mon_quorum: None,
            captured_at,
        }
    }
}

/// Canonical fact record. Immutable once built; classification, scoring, and
/// narrative generation all read from the same instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterFacts {
    pub health_state: HealthState,
    pub osds_up: u64,
    pub osds_in: u64,
    pub osds_total: u64,
    pub pg_degraded: u64,
    pub pg_undersized: u64,
    pub pg_unassigned: u64,
    pub pg_down: u64,
    pub mon_quorum: QuorumState,
    pub health_checks: BTreeSet<String>,
    /// Counter fields that were absent at the source and defaulted to 0.
    pub estimated: BTreeSet<FactField>,
    pub captured_at: DateTime<Utc>,
}

impl ClusterFacts {
    /// Whether a counter was defaulted rather than observed.
    pub fn is_estimated(&self, field: FactField) -> bool {
        self.estimated.contains(&field)
    }

    /// OSDs that are in the cluster but not up. Saturating: inconsistent
    /// counters are a data-quality signal, not an arithmetic hazard.
    pub fn osds_down(&self) -> u64 {
        self.osds_in.saturating_sub(self.osds_up)
    }

    /// Typed membership test over the health-check identifiers.
    pub fn has_check(&self, id: &str) -> bool {
        self.health_checks.contains(id)
    }

    /// `osds_up <= osds_in <= osds_total` holds for a well-behaved source.
    pub fn counts_consistent(&self) -> bool {
        self.osds_up <= self.osds_in && self.osds_in <= self.osds_total
    }
}

/// Builds [`ClusterFacts`] from a raw snapshot. Pure: the same snapshot
/// always yields an identical record.
pub fn normalize(raw: &RawSnapshot) -> Result<ClusterFacts, RcaError> {
    let mut estimated = BTreeSet::new();

    let osds_up = counter(&raw.osds_up, FactField::OsdsUp, &mut estimated)?;
    let osds_in = counter(&raw.osds_in, FactField::OsdsIn, &mut estimated)?;
    let osds_total = counter(&raw.osds_total, FactField::OsdsTotal, &mut estimated)?;
    let pg_degraded = counter(&raw.pg_degraded, FactField::PgDegraded, &mut estimated)?;
    let pg_undersized = counter(&raw.pg_undersized, FactField::PgUndersized, &mut estimated)?;
    let pg_unassigned = counter(&raw.pg_unassigned, FactField::PgUnassigned, &mut estimated)?;
    let pg_down = counter(&raw.pg_down, FactField::PgDown, &mut estimated)?;

    let health_state = match raw.health_status.as_deref() {
        Some(status) => HealthState::from_raw(status),
        None => HealthState::Unknown,
    };

    let facts = ClusterFacts {
        health_state,
        osds_up,
        osds_in,
        osds_total,
        pg_degraded,
        pg_undersized,
        pg_unassigned,
        pg_down,
        mon_quorum: QuorumState::from_raw(raw.mon_quorum),
        health_checks: raw.health_checks.iter().cloned().collect(),
        estimated,
        captured_at: raw.captured_at,
    };

    if !facts.counts_consistent() {
        warn!(
            "OSD counters inconsistent: up={} in={} total={}",
            facts.osds_up, facts.osds_in, facts.osds_total
        );
    }

    Ok(facts)
}

fn counter(
    raw: &Option<String>,
    field: FactField,
    estimated: &mut BTreeSet<FactField>,
) -> Result<u64, RcaError> {
    match raw {
        None => {
            estimated.insert(field);
            Ok(0)
        }
        Some(text) => parse_counter(text).ok_or_else(|| RcaError::MalformedInput {
            field: field.as_str(),
            value: text.clone(),
        }),
    }
}

/// Accepts a base-10 unsigned integer or a Prometheus-style float with zero
/// fractional part ("3", "3.0", "1e2"). Negatives, NaN, infinities, and
/// non-numeric text are malformed.
fn parse_counter(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<u64>() {
        return Some(n);
    }
    let f: f64 = trimmed.parse().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn capture_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_absent_counters_default_to_estimated_zero() {
        let raw = RawSnapshot::empty(capture_time());
        let facts = normalize(&raw).unwrap();

        assert_eq!(facts.pg_degraded, 0);
        assert_eq!(facts.osds_up, 0);
        assert!(facts.is_estimated(FactField::PgDegraded));
        assert!(facts.is_estimated(FactField::OsdsUp));
        assert_eq!(facts.estimated.len(), 7);
    }

    #[test]
    fn test_present_unparseable_counter_names_field() {
        let mut raw = RawSnapshot::empty(capture_time());
        raw.pg_degraded = Some("garbage".to_string());

        let err = normalize(&raw).unwrap_err();
        match err {
            RcaError::MalformedInput { field, value } => {
                assert_eq!(field, "pg_degraded");
                assert_eq!(value, "garbage");
            }
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn test_prometheus_style_floats_accepted() {
        let mut raw = RawSnapshot::empty(capture_time());
        raw.osds_up = Some("3".to_string());
        raw.osds_in = Some("3.0".to_string());
        raw.pg_undersized = Some("1e2".to_string());

        let facts = normalize(&raw).unwrap();
        assert_eq!(facts.osds_up, 3);
        assert_eq!(facts.osds_in, 3);
        assert_eq!(facts.pg_undersized, 100);
        assert!(!facts.is_estimated(FactField::OsdsUp));
    }

    #[test]
    fn test_negative_and_fractional_values_rejected() {
        for bad in ["-1", "2.5", "NaN", "inf", ""] {
            let mut raw = RawSnapshot::empty(capture_time());
            raw.pg_down = Some(bad.to_string());
            let err = normalize(&raw).unwrap_err();
            assert_eq!(err.code(), "MALFORMED_INPUT", "value {bad:?} should be rejected");
        }
    }

    #[test]
    fn test_health_bucketing_is_case_insensitive() {
        assert_eq!(HealthState::from_raw("health_ok"), HealthState::Ok);
        assert_eq!(HealthState::from_raw("HEALTH_WARN"), HealthState::Warn);
        assert_eq!(HealthState::from_raw(" health_err "), HealthState::Error);
        assert_eq!(HealthState::from_raw("degraded-ish"), HealthState::Unknown);
    }

    #[test]
    fn test_absent_health_status_is_unknown_not_ok() {
        let raw = RawSnapshot::empty(capture_time());
        let facts = normalize(&raw).unwrap();
        assert_eq!(facts.health_state, HealthState::Unknown);
    }

    #[test]
    fn test_quorum_tri_state() {
        assert_eq!(QuorumState::from_raw(Some(true)), QuorumState::Ok);
        assert_eq!(QuorumState::from_raw(Some(false)), QuorumState::Lost);
        assert_eq!(QuorumState::from_raw(None), QuorumState::Unknown);
    }

    #[test]
    fn test_inconsistent_osd_counters_tolerated() {
        let mut raw = RawSnapshot::empty(capture_time());
        raw.osds_up = Some("5".to_string());
        raw.osds_in = Some("3".to_string());
        raw.osds_total = Some("2".to_string());

        let facts = normalize(&raw).unwrap();
        assert!(!facts.counts_consistent());
        assert_eq!(facts.osds_down(), 0);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let mut raw = RawSnapshot::empty(capture_time());
        raw.health_status = Some("HEALTH_WARN".to_string());
        raw.health_checks = vec!["PG_DEGRADED".to_string(), "OSD_DOWN".to_string()];
        raw.osds_up = Some("2".to_string());
        raw.osds_in = Some("3".to_string());
        raw.mon_quorum = Some(true);

        let first = normalize(&raw).unwrap();
        let second = normalize(&raw).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.captured_at, raw.captured_at);
    }

    #[test]
    fn test_health_checks_become_typed_set() {
        let mut raw = RawSnapshot::empty(capture_time());
        raw.health_checks = vec![
            "OSD_DOWN".to_string(),
            "PG_DEGRADED".to_string(),
            "OSD_DOWN".to_string(),
        ];

        let facts = normalize(&raw).unwrap();
        assert_eq!(facts.health_checks.len(), 2);
        assert!(facts.has_check("PG_DEGRADED"));
        assert!(!facts.has_check("PG_DEGRADED_FULL"));
    }
}
