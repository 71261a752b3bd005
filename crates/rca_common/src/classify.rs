//! Incident classification: ordered rule evaluation over cluster facts.
//!
//! Classification is a total function. The rules live in an explicit ordered
//! table evaluated top-down with first match winning, so the precedence is
//! auditable and each rule can be tested on its own. Availability gates
//! everything: a cluster with zero serving OSDs is an outage no matter what
//! the health string says.

use serde::{Deserialize, Serialize};

use crate::facts::{ClusterFacts, HealthState};

/// Exactly one category is assigned per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentCategory {
    NoIncident,
    TotalOutage,
    DegradedRedundancy,
    ReplicaMismatch,
    CapacityOrConfigRisk,
    ConfigWarning,
    UnknownCondition,
}

impl IncidentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentCategory::NoIncident => "NO_INCIDENT",
            IncidentCategory::TotalOutage => "TOTAL_OUTAGE",
            IncidentCategory::DegradedRedundancy => "DEGRADED_REDUNDANCY",
            IncidentCategory::ReplicaMismatch => "REPLICA_MISMATCH",
            IncidentCategory::CapacityOrConfigRisk => "CAPACITY_OR_CONFIG_RISK",
            IncidentCategory::ConfigWarning => "CONFIG_WARNING",
            IncidentCategory::UnknownCondition => "UNKNOWN_CONDITION",
        }
    }

    /// One-line operator summary used in report headers and verdicts.
    pub fn summary(&self) -> &'static str {
        match self {
            IncidentCategory::NoIncident => "Cluster is healthy.",
            IncidentCategory::TotalOutage => "No OSDs are serving data.",
            IncidentCategory::DegradedRedundancy => {
                "Placement groups are running with reduced redundancy."
            }
            IncidentCategory::ReplicaMismatch => {
                "Placement groups have fewer replicas than policy requires."
            }
            IncidentCategory::CapacityOrConfigRisk => {
                "Cluster is impaired by capacity or configuration problems."
            }
            IncidentCategory::ConfigWarning => {
                "Cluster operational with configuration warnings."
            }
            IncidentCategory::UnknownCondition => "Unable to classify cluster state.",
        }
    }
}

impl std::fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the classification table.
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&ClusterFacts) -> bool,
    pub category: IncidentCategory,
}

fn total_outage(facts: &ClusterFacts) -> bool {
    facts.osds_up == 0
}

fn healthy(facts: &ClusterFacts) -> bool {
    facts.health_state == HealthState::Ok
}

fn warn_degraded_pgs(facts: &ClusterFacts) -> bool {
    facts.health_state == HealthState::Warn && facts.pg_degraded > 0
}

fn warn_undersized_pgs(facts: &ClusterFacts) -> bool {
    facts.health_state == HealthState::Warn && facts.pg_undersized > 0
}

fn warn_no_osd_outage(facts: &ClusterFacts) -> bool {
    facts.health_state == HealthState::Warn && facts.osds_up == facts.osds_in
}

fn warn_osd_outage(facts: &ClusterFacts) -> bool {
    facts.health_state == HealthState::Warn
}

fn error_state(facts: &ClusterFacts) -> bool {
    facts.health_state == HealthState::Error
}

/// Classification table, evaluated top-down. Order is a design decision:
/// the availability gate outranks the health string, and active PG
/// redundancy deficits outrank generic configuration noise.
pub const RULES: &[Rule] = &[
    Rule {
        name: "total_outage",
        applies: total_outage,
        category: IncidentCategory::TotalOutage,
    },
    Rule {
        name: "healthy",
        applies: healthy,
        category: IncidentCategory::NoIncident,
    },
    Rule {
        name: "warn_degraded_pgs",
        applies: warn_degraded_pgs,
        category: IncidentCategory::DegradedRedundancy,
    },
    Rule {
        name: "warn_undersized_pgs",
        applies: warn_undersized_pgs,
        category: IncidentCategory::ReplicaMismatch,
    },
    Rule {
        name: "warn_no_osd_outage",
        applies: warn_no_osd_outage,
        category: IncidentCategory::ConfigWarning,
    },
    Rule {
        name: "warn_osd_outage",
        applies: warn_osd_outage,
        category: IncidentCategory::CapacityOrConfigRisk,
    },
    Rule {
        name: "error_state",
        applies: error_state,
        category: IncidentCategory::CapacityOrConfigRisk,
    },
];

/// Maps facts to exactly one category. Total: every input matches a rule or
/// falls through to `UnknownCondition`.
pub fn classify(facts: &ClusterFacts) -> IncidentCategory {
    for rule in RULES {
        if (rule.applies)(facts) {
            return rule.category;
        }
    }
    IncidentCategory::UnknownCondition
}
