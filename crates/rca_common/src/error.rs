//! Error taxonomy for the RCA pipeline.
//!
//! Only two kinds of failure abort a run: malformed input (a value that was
//! present but unparseable) and an unreachable collector. A failed narrative
//! call is recovered inside the generator and never reaches the caller.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RcaError {
    /// A raw value was present but could not be parsed. Names the field so
    /// the operator knows which collector output to inspect.
    #[error("malformed input: field '{field}' has unparseable value '{value}'")]
    MalformedInput { field: &'static str, value: String },

    /// The metrics/status source could not be reached. The run aborts rather
    /// than reporting stale or defaulted facts.
    #[error("collector unavailable: {0}")]
    CollectorUnavailable(String),

    /// The text-generation call failed or returned malformed content.
    /// Recovered by switching to the deterministic fallback narrative.
    #[error("narrative unavailable: {0}")]
    NarrativeUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RcaError {
    /// Stable code for logs and exit paths.
    pub fn code(&self) -> &'static str {
        match self {
            RcaError::MalformedInput { .. } => "MALFORMED_INPUT",
            RcaError::CollectorUnavailable(_) => "COLLECTOR_UNAVAILABLE",
            RcaError::NarrativeUnavailable(_) => "NARRATIVE_UNAVAILABLE",
            RcaError::Io(_) => "IO",
            RcaError::Json(_) => "JSON",
            RcaError::Toml(_) => "TOML",
        }
    }

    /// Whether this error must abort the run. Narrative failures are the one
    /// recoverable case: the generator absorbs them into the fallback path.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RcaError::NarrativeUnavailable(_))
    }
}
