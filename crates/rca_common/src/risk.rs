//! Additive risk scoring with attributed reasons.
//!
//! Scoring is a pure function of the facts and deliberately independent of
//! the classifier: both are derived views of the same record, and the
//! narrative cross-checks them instead of assuming they agree. Trigger
//! points and thresholds are fixed constants; the only exception to the
//! score-to-level mapping is the zero-OSD override, which is a hard business
//! rule.

use serde::{Deserialize, Serialize};

use crate::facts::{ClusterFacts, HealthState, QuorumState};

pub const UNHEALTHY_POINTS: u32 = 40;
pub const OSD_OUTAGE_POINTS: u32 = 30;
pub const PG_DEGRADED_POINTS: u32 = 20;
pub const PG_UNDERSIZED_POINTS: u32 = 15;
pub const QUORUM_LOST_POINTS: u32 = 20;

pub const MEDIUM_THRESHOLD: u32 = 30;
pub const HIGH_THRESHOLD: u32 = 60;

/// Canonical reason reported when no trigger fires. `reasons` is never empty.
pub const NO_ISSUES_REASON: &str = "No critical issues detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Threshold mapping: `<30` LOW, `30..=59` MEDIUM, `>=60` HIGH.
    pub fn for_score(score: u32) -> Self {
        if score >= HIGH_THRESHOLD {
            RiskLevel::High
        } else if score >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub score: u32,
    /// Ordered trigger attributions. Never empty.
    pub reasons: Vec<String>,
}

/// Scores the facts. Triggers are additive and evaluated in a fixed order so
/// the reason list is deterministic.
pub fn assess_risk(facts: &ClusterFacts) -> RiskAssessment {
    let mut score = 0;
    let mut reasons = Vec::new();

    if facts.health_state != HealthState::Ok {
        score += UNHEALTHY_POINTS;
        reasons.push("Unhealthy cluster state".to_string());
    }
    if facts.osds_up < facts.osds_in {
        score += OSD_OUTAGE_POINTS;
        reasons.push(format!("{} OSD(s) down", facts.osds_down()));
    }
    if facts.pg_degraded > 0 {
        score += PG_DEGRADED_POINTS;
        reasons.push(format!("{} placement group(s) degraded", facts.pg_degraded));
    }
    if facts.pg_undersized > 0 {
        score += PG_UNDERSIZED_POINTS;
        reasons.push(format!(
            "{} placement group(s) undersized",
            facts.pg_undersized
        ));
    }
    if facts.mon_quorum == QuorumState::Lost {
        score += QUORUM_LOST_POINTS;
        reasons.push("Monitor quorum compromised".to_string());
    }

    if reasons.is_empty() {
        reasons.push(NO_ISSUES_REASON.to_string());
    }

    // Zero serving OSDs is catastrophic even if every other signal is quiet.
    let level = if facts.osds_up == 0 {
        RiskLevel::High
    } else {
        RiskLevel::for_score(score)
    };

    RiskAssessment {
        level,
        score,
        reasons,
    }
}
