//! Ceph RCA engine - fact normalization, incident classification,
//! risk scoring, and narrative generation.
//!
//! Everything here is deterministic and side-effect free except the
//! narrative generator, which calls an injected [`narrative::ChatTransport`]
//! and falls back to a deterministic template when that call fails.

pub mod classify;
pub mod config;
pub mod error;
pub mod facts;
pub mod narrative;
pub mod report;
pub mod risk;

pub use classify::{classify, IncidentCategory};
pub use config::RcaConfig;
pub use error::RcaError;
pub use facts::{normalize, ClusterFacts, FactField, HealthState, QuorumState, RawSnapshot};
pub use narrative::{
    ChatTransport, Narrative, NarrativeGenerator, NarrativeSection, NarrativeSource,
};
pub use report::RcaResult;
pub use risk::{assess_risk, RiskAssessment, RiskLevel};
