//! RCA narrative generation.
//!
//! Two strategies produce the same five-section document. The generated path
//! sends a bounded, policy-constrained prompt to an external chat collaborator
//! through the [`ChatTransport`] seam and validates the reply before trusting
//! it. The fallback path synthesizes the sections deterministically from the
//! facts. A run never fails for lack of a narrative: every generated-path
//! error is absorbed into the fallback.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::classify::IncidentCategory;
use crate::error::RcaError;
use crate::facts::{ClusterFacts, QuorumState};
use crate::risk::{RiskAssessment, RiskLevel};

/// Required sections, in report order. A generated reply missing any of them
/// is rejected wholesale.
pub const REQUIRED_SECTIONS: [&str; 5] = [
    "Root Cause",
    "Impact",
    "Immediate Remediation",
    "Long-Term Preventive Actions",
    "Failure Prediction",
];

/// Constraints embedded in every prompt. The collaborator describes only the
/// assessed incident; it never escalates beyond the evidence.
pub const GROUNDING_RULES: &str = "STRICT RULES:
- Do NOT invent outages or failures beyond the evidence below
- Do NOT claim data loss unless the evidence states it
- If OSDs are up, the cluster is operational
- HEALTH_WARN is not a failure
- Only explain the assessed incident category
- Do not claim total failure unless zero OSDs are up";

/// Hard cap on prompt size.
pub const MAX_PROMPT_CHARS: usize = 8_192;

/// Health-check identifiers listed in the prompt before eliding the rest.
const MAX_PROMPT_CHECKS: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSection {
    pub heading: String,
    pub body: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NarrativeSource {
    Generated,
    Fallback,
}

impl NarrativeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeSource::Generated => "GENERATED",
            NarrativeSource::Fallback => "FALLBACK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub sections: Vec<NarrativeSection>,
    pub source: NarrativeSource,
}

/// Transport seam to the external text-generation collaborator.
///
/// The implementation owns the model identifier, temperature, auth, and the
/// bounded timeout, and performs exactly one outbound call per `complete`
/// invocation. No retries: a failed call surfaces immediately as
/// [`RcaError::NarrativeUnavailable`] and the generator falls back.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Value, RcaError>;
}

pub struct NarrativeGenerator {
    transport: Arc<dyn ChatTransport>,
}

impl NarrativeGenerator {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Produces the narrative. Never fails: any generated-path error switches
    /// to the deterministic fallback, so the caller always receives five
    /// non-empty sections.
    pub async fn generate(
        &self,
        facts: &ClusterFacts,
        category: IncidentCategory,
        risk: &RiskAssessment,
    ) -> Narrative {
        let prompt = build_prompt(facts, category, risk);
        match self.try_generated(&prompt).await {
            Ok(sections) => Narrative {
                sections,
                source: NarrativeSource::Generated,
            },
            Err(e) => {
                warn!(
                    "Narrative generation failed, using deterministic fallback: {}",
                    e
                );
                Narrative {
                    sections: fallback_sections(facts, category, risk),
                    source: NarrativeSource::Fallback,
                }
            }
        }
    }

    async fn try_generated(&self, prompt: &str) -> Result<Vec<NarrativeSection>, RcaError> {
        let reply = self.transport.complete(prompt).await?;
        let content = extract_content(&reply).ok_or_else(|| {
            RcaError::NarrativeUnavailable(
                "response missing a usable 'choices' payload".to_string(),
            )
        })?;
        parse_sections(&content).ok_or_else(|| {
            RcaError::NarrativeUnavailable(
                "generated text missing one or more required sections".to_string(),
            )
        })
    }
}

/// Builds the bounded prompt embedding facts, assessment, and constraints.
pub fn build_prompt(
    facts: &ClusterFacts,
    category: IncidentCategory,
    risk: &RiskAssessment,
) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are a senior Ceph SRE writing a root-cause-analysis report.\n\n");
    prompt.push_str(GROUNDING_RULES);
    prompt.push_str("\n\nASSESSMENT:\n");
    prompt.push_str(&format!(
        "- Incident category: {} ({})\n",
        category,
        category.summary()
    ));
    prompt.push_str(&format!("- Risk: {} (score {})\n", risk.level, risk.score));
    prompt.push_str("- Risk reasons:\n");
    for reason in &risk.reasons {
        prompt.push_str(&format!("  - {}\n", reason));
    }

    prompt.push_str("\nCLUSTER FACTS:\n");
    prompt.push_str(&format!("- Health state: {}\n", facts.health_state.as_str()));
    prompt.push_str(&format!(
        "- OSDs: {} up / {} in / {} total\n",
        facts.osds_up, facts.osds_in, facts.osds_total
    ));
    prompt.push_str(&format!(
        "- Placement groups: {} degraded, {} undersized, {} unassigned, {} down\n",
        facts.pg_degraded, facts.pg_undersized, facts.pg_unassigned, facts.pg_down
    ));
    prompt.push_str(&format!(
        "- Monitor quorum: {}\n",
        facts.mon_quorum.as_str()
    ));
    if !facts.health_checks.is_empty() {
        let listed: Vec<&str> = facts
            .health_checks
            .iter()
            .take(MAX_PROMPT_CHECKS)
            .map(|s| s.as_str())
            .collect();
        let elided = facts.health_checks.len().saturating_sub(listed.len());
        if elided > 0 {
            prompt.push_str(&format!(
                "- Active health checks: {} (+{} more)\n",
                listed.join(", "),
                elided
            ));
        } else {
            prompt.push_str(&format!("- Active health checks: {}\n", listed.join(", ")));
        }
    }
    if !facts.estimated.is_empty() {
        let fields: Vec<&str> = facts.estimated.iter().map(|f| f.as_str()).collect();
        prompt.push_str(&format!(
            "- Values estimated (absent at source): {}\n",
            fields.join(", ")
        ));
    }

    prompt.push_str("\nWrite exactly these five sections, each under this exact heading:\n");
    for (i, heading) in REQUIRED_SECTIONS.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, heading));
    }

    if prompt.len() > MAX_PROMPT_CHARS {
        // The cap is in bytes; back off to a char boundary so check
        // identifiers with non-ASCII text cannot split a code point.
        let mut cut = MAX_PROMPT_CHARS;
        while !prompt.is_char_boundary(cut) {
            cut -= 1;
        }
        prompt.truncate(cut);
    }
    prompt
}

/// Pulls the generated text out of a chat-completions reply. Anything that
/// does not carry a non-empty `choices[0].message.content` string is treated
/// as a failed call, never as partial success.
fn extract_content(reply: &Value) -> Option<String> {
    let content = reply
        .get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()?;
    if content.trim().is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

/// Splits generated text into the required sections. Heading lines are
/// matched case-insensitively, tolerating markdown markers and numbering.
/// Returns `None` unless all five sections are present and non-empty.
fn parse_sections(content: &str) -> Option<Vec<NarrativeSection>> {
    let mut bodies: Vec<Vec<String>> = vec![Vec::new(); REQUIRED_SECTIONS.len()];
    let mut current: Option<usize> = None;

    for line in content.lines() {
        let normalized = normalize_heading(line);
        if let Some(idx) = REQUIRED_SECTIONS
            .iter()
            .position(|h| h.to_ascii_lowercase() == normalized)
        {
            current = Some(idx);
            continue;
        }
        if let Some(idx) = current {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                bodies[idx].push(trimmed.to_string());
            }
        }
    }

    if bodies.iter().any(|body| body.is_empty()) {
        return None;
    }
    Some(
        REQUIRED_SECTIONS
            .iter()
            .zip(bodies)
            .map(|(heading, body)| NarrativeSection {
                heading: heading.to_string(),
                body,
            })
            .collect(),
    )
}

fn normalize_heading(line: &str) -> String {
    line.trim()
        .trim_start_matches(|c: char| matches!(c, '#' | '*' | '0'..='9' | '.' | ')' | ' '))
        .trim_end_matches(|c: char| matches!(c, ':' | '*' | ' '))
        .to_ascii_lowercase()
}

/// Deterministic narrative: the same five sections, parameterized by the
/// actual numbers. Less rich than the generated path, never wrong.
pub fn fallback_sections(
    facts: &ClusterFacts,
    category: IncidentCategory,
    risk: &RiskAssessment,
) -> Vec<NarrativeSection> {
    vec![
        section(REQUIRED_SECTIONS[0], root_cause_lines(facts, category)),
        section(REQUIRED_SECTIONS[1], impact_lines(facts, risk)),
        section(REQUIRED_SECTIONS[2], remediation_lines(facts, category)),
        section(REQUIRED_SECTIONS[3], prevention_lines(category)),
        section(REQUIRED_SECTIONS[4], prediction_lines(facts, risk)),
    ]
}

fn section(heading: &str, body: Vec<String>) -> NarrativeSection {
    NarrativeSection {
        heading: heading.to_string(),
        body,
    }
}

fn root_cause_lines(facts: &ClusterFacts, category: IncidentCategory) -> Vec<String> {
    let mut lines = Vec::new();
    match category {
        IncidentCategory::NoIncident => {
            lines.push(format!(
                "Cluster health is {} with {} of {} in-cluster OSDs up; no incident condition was detected.",
                facts.health_state.as_str(),
                facts.osds_up,
                facts.osds_in
            ));
        }
        IncidentCategory::TotalOutage => {
            lines.push(format!(
                "All serving capacity is lost: {} of {} in-cluster OSDs are up.",
                facts.osds_up, facts.osds_in
            ));
            if facts.mon_quorum == QuorumState::Lost {
                lines.push(
                    "Monitor quorum is compromised, so the control plane cannot coordinate recovery."
                        .to_string(),
                );
            }
        }
        IncidentCategory::DegradedRedundancy => {
            lines.push(format!(
                "{} placement group(s) are degraded: some objects currently have fewer copies than required.",
                facts.pg_degraded
            ));
            if facts.osds_down() > 0 {
                lines.push(format!(
                    "{} OSD(s) are down ({} up of {} in), the most likely origin of the redundancy deficit.",
                    facts.osds_down(),
                    facts.osds_up,
                    facts.osds_in
                ));
            }
        }
        IncidentCategory::ReplicaMismatch => {
            lines.push(format!(
                "{} placement group(s) are undersized: their acting sets hold fewer replicas than the pool size requires.",
                facts.pg_undersized
            ));
            if facts.osds_down() > 0 {
                lines.push(format!(
                    "{} OSD(s) are down ({} up of {} in), reducing the placement candidates available.",
                    facts.osds_down(),
                    facts.osds_up,
                    facts.osds_in
                ));
            }
        }
        IncidentCategory::CapacityOrConfigRisk => {
            lines.push(format!(
                "Cluster health is {} with {} of {} in-cluster OSDs up.",
                facts.health_state.as_str(),
                facts.osds_up,
                facts.osds_in
            ));
            lines.push(
                "Capacity loss or a configuration fault is degrading the cluster's service headroom."
                    .to_string(),
            );
        }
        IncidentCategory::ConfigWarning => {
            lines.push(format!(
                "Cluster health is {} while all {} in-cluster OSDs are up; the warning points at configuration rather than capacity.",
                facts.health_state.as_str(),
                facts.osds_in
            ));
        }
        IncidentCategory::UnknownCondition => {
            lines.push(format!(
                "The cluster reported a health state outside the known buckets; {} of {} in-cluster OSDs are up.",
                facts.osds_up, facts.osds_in
            ));
            lines.push(
                "Collector output may be incomplete or come from an unsupported cluster version."
                    .to_string(),
            );
        }
    }
    if !facts.health_checks.is_empty() {
        let checks: Vec<&str> = facts.health_checks.iter().map(|s| s.as_str()).collect();
        lines.push(format!("Active health checks: {}.", checks.join(", ")));
    }
    if !facts.counts_consistent() {
        lines.push(format!(
            "OSD counters are inconsistent (up {} / in {} / total {}); treat exact counts with caution.",
            facts.osds_up, facts.osds_in, facts.osds_total
        ));
    }
    lines
}

fn impact_lines(facts: &ClusterFacts, risk: &RiskAssessment) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(match risk.level {
        RiskLevel::High => "Service availability is at immediate risk.".to_string(),
        RiskLevel::Medium => {
            "Service continues but with reduced headroom or redundancy.".to_string()
        }
        RiskLevel::Low => "No material service impact is expected.".to_string(),
    });
    if facts.pg_down > 0 {
        lines.push(format!(
            "{} placement group(s) are down: data in them is unavailable until they recover.",
            facts.pg_down
        ));
    }
    if facts.pg_unassigned > 0 {
        lines.push(format!(
            "{} placement group(s) are unassigned and not being served.",
            facts.pg_unassigned
        ));
    }
    lines.push("Contributing indicators:".to_string());
    for reason in &risk.reasons {
        lines.push(format!("- {}", reason));
    }
    lines
}

fn remediation_lines(facts: &ClusterFacts, category: IncidentCategory) -> Vec<String> {
    if category == IncidentCategory::NoIncident {
        return vec![
            "No remediation required.".to_string(),
            "Archive this report as a healthy baseline for comparison.".to_string(),
        ];
    }
    let mut lines = vec!["Run 'ceph health detail' to enumerate the active checks.".to_string()];
    if facts.osds_down() > 0 || facts.osds_up == 0 {
        lines.push(
            "Run 'ceph osd tree down' to locate the down OSDs, then check the daemons with 'systemctl status ceph-osd@<id>' on their hosts."
                .to_string(),
        );
        lines.push(
            "Restart failed daemons with 'systemctl restart ceph-osd@<id>' once the host-level fault is cleared."
                .to_string(),
        );
    }
    if facts.pg_degraded > 0 || facts.pg_undersized > 0 {
        lines.push(
            "Run 'ceph pg dump_stuck' to list the affected placement groups and confirm recovery is progressing."
                .to_string(),
        );
    }
    if facts.mon_quorum == QuorumState::Lost {
        lines.push(
            "Check monitor quorum with 'ceph mon stat' and restore a monitor majority before anything else."
                .to_string(),
        );
    }
    if category == IncidentCategory::ConfigWarning {
        lines.push("Review recent configuration changes with 'ceph config log'.".to_string());
    }
    lines
}

fn prevention_lines(category: IncidentCategory) -> Vec<String> {
    let mut lines = vec![
        "Alert on cluster health and per-OSD up/down transitions so incidents page before clients notice."
            .to_string(),
    ];
    match category {
        IncidentCategory::TotalOutage => lines.push(
            "Distribute OSDs across independent failure domains so no single fault can take all of them down."
                .to_string(),
        ),
        IncidentCategory::DegradedRedundancy | IncidentCategory::ReplicaMismatch => lines.push(
            "Revisit pool size and min_size so a single host failure cannot leave placement groups undersized."
                .to_string(),
        ),
        IncidentCategory::CapacityOrConfigRisk => lines.push(
            "Track capacity headroom and keep nearfull/full ratios with enough margin for rebalancing."
                .to_string(),
        ),
        IncidentCategory::ConfigWarning => lines.push(
            "Gate configuration changes behind review; recurring warnings usually trace back to unreviewed edits."
                .to_string(),
        ),
        IncidentCategory::UnknownCondition => lines.push(
            "Keep collector and cluster versions aligned so health output stays parseable.".to_string(),
        ),
        IncidentCategory::NoIncident => lines.push(
            "Rehearse OSD host failure periodically to verify recovery completes within the redundancy budget."
                .to_string(),
        ),
    }
    lines
}

fn prediction_lines(facts: &ClusterFacts, risk: &RiskAssessment) -> Vec<String> {
    let mut lines = Vec::new();
    match risk.level {
        RiskLevel::High => {
            lines.push(
                "Without intervention, continued operation is likely to degrade into data unavailability."
                    .to_string(),
            );
            if facts.osds_up == 0 {
                lines.push(
                    "The cluster is already unable to serve data; every hour in this state extends client downtime."
                        .to_string(),
                );
            }
        }
        RiskLevel::Medium => lines.push(
            "If the contributing indicators persist, expect escalation to a high-risk state at the next component failure."
                .to_string(),
        ),
        RiskLevel::Low => lines.push(
            "No failure is expected under current conditions; continue routine monitoring.".to_string(),
        ),
    }
    lines.push(format!(
        "Assessed failure risk: {} (score {}).",
        risk.level, risk.score
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{normalize, RawSnapshot};
    use crate::risk::assess_risk;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn mock_facts(health: &str, osds_up: u64, osds_in: u64) -> ClusterFacts {
        let mut raw = RawSnapshot::empty(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        raw.health_status = Some(health.to_string());
        raw.osds_up = Some(osds_up.to_string());
        raw.osds_in = Some(osds_in.to_string());
        raw.osds_total = Some(osds_in.to_string());
        normalize(&raw).unwrap()
    }

    /// Scripted transport: returns the canned reply once, then errors.
    struct FakeTransport {
        reply: Mutex<Option<Result<Value, RcaError>>>,
        calls: AtomicUsize,
    }

    impl FakeTransport {
        fn ok(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(Ok(reply))),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(Err(RcaError::NarrativeUnavailable(
                    message.to_string(),
                )))),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatTransport for FakeTransport {
        async fn complete(&self, _prompt: &str) -> Result<Value, RcaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(RcaError::NarrativeUnavailable("no scripted reply".into())))
        }
    }

    fn well_formed_reply() -> Value {
        let content = "Root Cause\nOne OSD host lost power.\n\n\
                       Impact\nRedundancy is reduced for affected placement groups.\n\n\
                       Immediate Remediation\nRestart the OSD daemon.\n\n\
                       Long-Term Preventive Actions\nAdd redundant power feeds.\n\n\
                       Failure Prediction\nLow risk once the OSD rejoins.";
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[tokio::test]
    async fn test_well_formed_reply_is_generated() {
        let transport = FakeTransport::ok(well_formed_reply());
        let generator = NarrativeGenerator::new(transport.clone());

        let facts = mock_facts("HEALTH_WARN", 2, 3);
        let risk = assess_risk(&facts);
        let narrative = generator
            .generate(&facts, IncidentCategory::CapacityOrConfigRisk, &risk)
            .await;

        assert_eq!(narrative.source, NarrativeSource::Generated);
        assert_eq!(narrative.sections.len(), 5);
        assert_eq!(narrative.sections[0].heading, "Root Cause");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_falls_back() {
        let transport = FakeTransport::failing("connection timed out");
        let generator = NarrativeGenerator::new(transport.clone());

        let facts = mock_facts("HEALTH_WARN", 1, 3);
        let risk = assess_risk(&facts);
        let narrative = generator
            .generate(&facts, IncidentCategory::CapacityOrConfigRisk, &risk)
            .await;

        assert_eq!(narrative.source, NarrativeSource::Fallback);
        assert_eq!(narrative.sections.len(), 5);
        for section in &narrative.sections {
            assert!(!section.body.is_empty(), "{} is empty", section.heading);
        }
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reply_without_choices_falls_back() {
        let transport = FakeTransport::ok(json!({"error": {"message": "rate limited"}}));
        let generator = NarrativeGenerator::new(transport);

        let facts = mock_facts("HEALTH_ERR", 1, 3);
        let risk = assess_risk(&facts);
        let narrative = generator
            .generate(&facts, IncidentCategory::CapacityOrConfigRisk, &risk)
            .await;

        assert_eq!(narrative.source, NarrativeSource::Fallback);
    }

    #[tokio::test]
    async fn test_reply_missing_a_section_falls_back() {
        let content = "Root Cause\nSomething broke.\n\nImpact\nBad.";
        let transport =
            FakeTransport::ok(json!({"choices": [{"message": {"content": content}}]}));
        let generator = NarrativeGenerator::new(transport);

        let facts = mock_facts("HEALTH_WARN", 2, 3);
        let risk = assess_risk(&facts);
        let narrative = generator
            .generate(&facts, IncidentCategory::CapacityOrConfigRisk, &risk)
            .await;

        assert_eq!(narrative.source, NarrativeSource::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_numbers_match_facts_exactly() {
        let transport = FakeTransport::failing("boom");
        let generator = NarrativeGenerator::new(transport);

        let facts = mock_facts("HEALTH_WARN", 1, 3);
        let risk = assess_risk(&facts);
        let narrative = generator
            .generate(&facts, IncidentCategory::CapacityOrConfigRisk, &risk)
            .await;

        let all_text: String = narrative
            .sections
            .iter()
            .flat_map(|s| s.body.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        assert!(all_text.contains("1 of 3 in-cluster OSDs up")
            || all_text.contains("1 of 3 in-cluster OSDs are up"));
        assert!(all_text.contains("2 OSD(s) down"));
        assert!(all_text.contains(&format!("score {}", risk.score)));
    }

    #[test]
    fn test_parse_sections_tolerates_markdown_and_numbering() {
        let content = "## Root Cause\nPower loss.\n\
                       **Impact:**\nReduced redundancy.\n\
                       3. Immediate Remediation\nRestart daemon.\n\
                       LONG-TERM PREVENTIVE ACTIONS\nDual power feeds.\n\
                       Failure Prediction:\nLow.";
        let sections = parse_sections(content).unwrap();
        assert_eq!(sections.len(), 5);
        assert_eq!(sections[1].heading, "Impact");
        assert_eq!(sections[1].body, vec!["Reduced redundancy.".to_string()]);
    }

    #[test]
    fn test_parse_sections_rejects_empty_section_body() {
        let content = "Root Cause\n\nImpact\nBad.\n\
                       Immediate Remediation\nFix.\n\
                       Long-Term Preventive Actions\nPlan.\n\
                       Failure Prediction\nLow.";
        assert!(parse_sections(content).is_none());
    }

    #[test]
    fn test_extract_content_requires_choices_shape() {
        assert!(extract_content(&json!({"choices": []})).is_none());
        assert!(extract_content(&json!({"choices": [{"message": {}}]})).is_none());
        assert!(extract_content(&json!({"choices": [{"message": {"content": "  "}}]})).is_none());
        assert_eq!(
            extract_content(&json!({"choices": [{"message": {"content": "text"}}]})),
            Some("text".to_string())
        );
    }

    #[test]
    fn test_prompt_embeds_constraints_and_numbers() {
        let facts = mock_facts("HEALTH_WARN", 1, 3);
        let risk = assess_risk(&facts);
        let prompt = build_prompt(&facts, IncidentCategory::CapacityOrConfigRisk, &risk);

        assert!(prompt.contains("Do NOT invent outages"));
        assert!(prompt.contains("CAPACITY_OR_CONFIG_RISK"));
        assert!(prompt.contains("1 up / 3 in / 3 total"));
        assert!(prompt.contains("2 OSD(s) down"));
        for heading in REQUIRED_SECTIONS {
            assert!(prompt.contains(heading));
        }
    }

    #[test]
    fn test_prompt_is_bounded_with_many_health_checks() {
        let mut facts = mock_facts("HEALTH_WARN", 2, 3);
        for i in 0..500 {
            facts
                .health_checks
                .insert(format!("SYNTHETIC_CHECK_{i:04}"));
        }
        let risk = assess_risk(&facts);
        let prompt = build_prompt(&facts, IncidentCategory::ConfigWarning, &risk);

        assert!(prompt.len() <= MAX_PROMPT_CHARS);
        assert!(prompt.contains("more)"));
    }

    #[test]
    fn test_prompt_cap_respects_char_boundaries() {
        // Long non-ASCII check identifiers put multi-byte text across the
        // cap. Padding sweeps the cut point over every alignment.
        for pad in 0..16 {
            let mut facts = mock_facts("HEALTH_WARN", 2, 3);
            facts
                .health_checks
                .insert(format!("AA_PAD_{}", "X".repeat(pad)));
            for i in 0..12 {
                facts
                    .health_checks
                    .insert(format!("CHECK_{i:02}_{}", "Ø".repeat(800)));
            }
            let risk = assess_risk(&facts);
            let prompt = build_prompt(&facts, IncidentCategory::ConfigWarning, &risk);
            assert!(prompt.len() <= MAX_PROMPT_CHARS);
        }
    }

    #[test]
    fn test_fallback_healthy_cluster_still_has_five_sections() {
        let facts = mock_facts("HEALTH_OK", 3, 3);
        let risk = assess_risk(&facts);
        let sections = fallback_sections(&facts, IncidentCategory::NoIncident, &risk);

        assert_eq!(sections.len(), 5);
        for section in &sections {
            assert!(!section.body.is_empty());
        }
        assert!(sections[2].body[0].contains("No remediation required"));
    }
}
