//! Final RCA result assembly and rendering.
//!
//! [`RcaResult`] is the single artifact the engine hands to consumers.
//! Assembly is pure; the renderers only lay out content that the engine has
//! already guaranteed to be complete (five sections, none empty).

use serde::{Deserialize, Serialize};

use crate::classify::IncidentCategory;
use crate::facts::{ClusterFacts, FactField};
use crate::narrative::{Narrative, NarrativeSection, NarrativeSource};
use crate::risk::RiskAssessment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcaResult {
    pub facts: ClusterFacts,
    pub category: IncidentCategory,
    pub risk: RiskAssessment,
    pub sections: Vec<NarrativeSection>,
    pub narrative_source: NarrativeSource,
}

impl RcaResult {
    /// Pure assembly of the engine's outputs into the report artifact.
    pub fn assemble(
        facts: ClusterFacts,
        category: IncidentCategory,
        risk: RiskAssessment,
        narrative: Narrative,
    ) -> Self {
        Self {
            facts,
            category,
            risk,
            sections: narrative.sections,
            narrative_source: narrative.source,
        }
    }
}

fn counter_cell(value: u64, estimated: bool) -> String {
    if estimated {
        format!("~{}", value)
    } else {
        value.to_string()
    }
}

/// Markdown rendering, used for the emitted report file.
pub fn format_markdown(result: &RcaResult) -> String {
    let facts = &result.facts;
    let mut out = String::new();

    out.push_str("# Ceph RCA Report\n\n");
    out.push_str(&format!(
        "- Captured: {}\n",
        facts.captured_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("- Incident category: {}\n", result.category));
    out.push_str(&format!(
        "- Risk: {} (score {})\n",
        result.risk.level, result.risk.score
    ));
    out.push_str(&format!(
        "- Narrative source: {}\n",
        result.narrative_source.as_str()
    ));
    out.push_str(&format!("\n{}\n", result.category.summary()));

    out.push_str("\n## Risk Indicators\n\n");
    for reason in &result.risk.reasons {
        out.push_str(&format!("- {}\n", reason));
    }

    out.push_str("\n## Cluster Facts\n\n");
    out.push_str("| Fact | Value |\n|------|-------|\n");
    out.push_str(&format!(
        "| Health state | {} |\n",
        facts.health_state.as_str()
    ));
    out.push_str(&format!(
        "| OSDs up | {} |\n",
        counter_cell(facts.osds_up, facts.is_estimated(FactField::OsdsUp))
    ));
    out.push_str(&format!(
        "| OSDs in | {} |\n",
        counter_cell(facts.osds_in, facts.is_estimated(FactField::OsdsIn))
    ));
    out.push_str(&format!(
        "| OSDs total | {} |\n",
        counter_cell(facts.osds_total, facts.is_estimated(FactField::OsdsTotal))
    ));
    out.push_str(&format!(
        "| PGs degraded | {} |\n",
        counter_cell(facts.pg_degraded, facts.is_estimated(FactField::PgDegraded))
    ));
    out.push_str(&format!(
        "| PGs undersized | {} |\n",
        counter_cell(
            facts.pg_undersized,
            facts.is_estimated(FactField::PgUndersized)
        )
    ));
    out.push_str(&format!(
        "| PGs unassigned | {} |\n",
        counter_cell(
            facts.pg_unassigned,
            facts.is_estimated(FactField::PgUnassigned)
        )
    ));
    out.push_str(&format!(
        "| PGs down | {} |\n",
        counter_cell(facts.pg_down, facts.is_estimated(FactField::PgDown))
    ));
    out.push_str(&format!(
        "| Monitor quorum | {} |\n",
        facts.mon_quorum.as_str()
    ));
    if !facts.health_checks.is_empty() {
        let checks: Vec<&str> = facts.health_checks.iter().map(|s| s.as_str()).collect();
        out.push_str(&format!("| Health checks | {} |\n", checks.join(", ")));
    }
    if !facts.estimated.is_empty() {
        out.push_str(
            "\n`~` marks a counter the source had no sample for, defaulted to zero.\n",
        );
    }
    if !facts.counts_consistent() {
        out.push_str(&format!(
            "\n> OSD counters are inconsistent (up {} / in {} / total {}).\n",
            facts.osds_up, facts.osds_in, facts.osds_total
        ));
    }

    for section in &result.sections {
        out.push_str(&format!("\n## {}\n\n", section.heading));
        for line in &section.body {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

/// Plain-text rendering for terminal output.
pub fn format_text(result: &RcaResult) -> String {
    let facts = &result.facts;
    let mut out = String::new();

    out.push_str("CEPH RCA REPORT\n");
    out.push_str("===============\n\n");
    out.push_str(&format!(
        "Captured:          {}\n",
        facts.captured_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("Incident category: {}\n", result.category));
    out.push_str(&format!(
        "Risk:              {} (score {})\n",
        result.risk.level, result.risk.score
    ));
    out.push_str(&format!(
        "Narrative source:  {}\n",
        result.narrative_source.as_str()
    ));
    out.push_str(&format!("\n{}\n", result.category.summary()));

    out.push_str("\nRisk indicators:\n");
    for reason in &result.risk.reasons {
        out.push_str(&format!("  - {}\n", reason));
    }

    out.push_str("\nCluster facts:\n");
    out.push_str(&format!(
        "  Health state:    {}\n",
        facts.health_state.as_str()
    ));
    out.push_str(&format!(
        "  OSDs:            {} up / {} in / {} total\n",
        facts.osds_up, facts.osds_in, facts.osds_total
    ));
    out.push_str(&format!(
        "  PGs:             {} degraded, {} undersized, {} unassigned, {} down\n",
        facts.pg_degraded, facts.pg_undersized, facts.pg_unassigned, facts.pg_down
    ));
    out.push_str(&format!(
        "  Monitor quorum:  {}\n",
        facts.mon_quorum.as_str()
    ));
    if !facts.health_checks.is_empty() {
        let checks: Vec<&str> = facts.health_checks.iter().map(|s| s.as_str()).collect();
        out.push_str(&format!("  Health checks:   {}\n", checks.join(", ")));
    }
    if !facts.estimated.is_empty() {
        let fields: Vec<&str> = facts.estimated.iter().map(|f| f.as_str()).collect();
        out.push_str(&format!(
            "  Estimated zero:  {} (no sample at source)\n",
            fields.join(", ")
        ));
    }

    for section in &result.sections {
        out.push_str(&format!("\n{}\n", section.heading.to_uppercase()));
        out.push_str(&format!("{}\n", "-".repeat(section.heading.len())));
        for line in &section.body {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}
