//! Result of a complete case check.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::case::CaseInputs;
use crate::decision::{DecisionOutput, Disposition};
use crate::evidence::EvidenceItem;

/// Everything a reviewer needs to audit one case check.
#[derive(Debug, Clone, Serialize)]
pub struct CaseCheckResult {
    /// The validated decision
    pub decision: DecisionOutput,

    /// How the collaborator's response was normalized
    pub disposition: Disposition,

    /// Evidence shown to the collaborator, best first
    pub evidence: Vec<EvidenceItem>,

    /// Case inputs the check ran with
    pub inputs: CaseInputs,

    /// Retrieval query derived from the inputs
    pub query: String,

    /// Source name of the document the evidence came from
    pub document: String,

    /// Session generation of that document
    pub generation: u64,

    /// Name of the decision provider, if one was consulted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Whether the raw decision came from the cache
    pub cached: bool,

    /// When the check completed
    pub checked_at: DateTime<Utc>,
}

impl CaseCheckResult {
    /// Pretty JSON for display or download.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
