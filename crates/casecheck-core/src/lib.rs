//! # casecheck-core
//!
//! Document-grounded evidence retrieval and decision validation.
//!
//! A reviewer uploads a process description. The crate splits it into
//! sentence chunks, indexes them with TF-IDF, retrieves the chunks most
//! relevant to a case, and validates the decision returned by an external
//! collaborator so the result always satisfies the output contract.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same document and query always produce the same evidence
//! 2. **Total normalization**: Any collaborator response yields a valid decision
//! 3. **Consistent sessions**: A corpus and its index are replaced together
//!
//! ## Example
//!
//! ```rust,ignore
//! use casecheck_core::{CaseInputs, CaseSession, Document, check_with_response};
//!
//! let session = CaseSession::default();
//! session.load_document(Document::from_file("process.pdf")?)?;
//!
//! let inputs = CaseInputs::from_json_file("case.json")?;
//! let result = check_with_response(&session, &inputs, Some(r#"{"approval":"No"}"#))?;
//!
//! println!("{}", result.decision.approval());
//! ```

pub mod case;
pub mod chunker;
pub mod config;
pub mod decision;
pub mod document;
pub mod evidence;
pub mod index;
pub mod retrieval;
pub mod session;
pub mod types;

// Re-export main types at crate root
pub use case::{CaseError, CaseInputs, DwhLookup};
pub use chunker::{chunk_text, split_sentences, Chunk, ChunkError};
pub use config::{ChunkingConfig, ConfigError, IndexConfig, PipelineConfig, RetrievalConfig};
pub use decision::{
    is_valid_decision, normalize, normalize_with_report, validate_decision_schema, Approval,
    DecisionOutput, Disposition, Normalization, SchemaError, NO_OUTPUT_RECOMMENDATION,
    UNPARSEABLE_RECOMMENDATION,
};
pub use document::{extract_text, Document, DocumentError, DocumentFormat};
pub use evidence::{chunk_id, EvidenceItem};
pub use index::{tokenize, IndexError, SearchIndex, SparseVector};
pub use retrieval::{retrieve, RetrievalError};
pub use session::{CaseSession, IndexedDocument, SessionError};
pub use types::CaseCheckResult;

use chrono::Utc;
use thiserror::Error;

/// Errors that can occur anywhere in the pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Case input error: {0}")]
    Case(#[from] CaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<RetrievalError> for PipelineError {
    fn from(err: RetrievalError) -> Self {
        Self::Session(SessionError::Retrieval(err))
    }
}

/// Validate the case inputs and retrieve evidence for them.
///
/// Returns the query the evidence was retrieved with.
pub fn gather_evidence(
    document: &IndexedDocument,
    inputs: &CaseInputs,
    top_k: usize,
) -> Result<(String, Vec<EvidenceItem>), PipelineError> {
    inputs.validate()?;
    let query = inputs.to_query();
    let evidence = document.retrieve(&query, top_k)?;
    Ok((query, evidence))
}

/// Run a case check against an already available collaborator response.
///
/// Retrieves evidence from the session's current document, normalizes
/// `raw` and records the result on the session.
pub fn check_with_response(
    session: &CaseSession,
    inputs: &CaseInputs,
    raw: Option<&str>,
) -> Result<CaseCheckResult, PipelineError> {
    let document = session.current()?;
    let (query, evidence) = gather_evidence(&document, inputs, session.config().retrieval.top_k)?;
    let normalization = normalize_with_report(raw);

    tracing::info!(
        approval = %normalization.decision.approval(),
        fallback = normalization.disposition.is_fallback(),
        evidence = evidence.len(),
        "Case checked"
    );

    let result = CaseCheckResult {
        decision: normalization.decision,
        disposition: normalization.disposition,
        evidence,
        inputs: inputs.clone(),
        query,
        document: document.document().source.clone(),
        generation: document.generation(),
        provider: None,
        cached: false,
        checked_at: Utc::now(),
    };
    session.record_result(result.clone());

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "Invoices above the contractual limit of 500 EUR are rejected without exception by the claims team. \
        A deviating account holder always requires a manual review by the claims department before payment. \
        One-time services are refunded in full when the invoice date lies within the contract period.";

    #[test]
    fn test_check_without_document() {
        let session = CaseSession::default();
        let err = check_with_response(&session, &CaseInputs::default(), None).unwrap_err();
        assert!(matches!(err, PipelineError::Session(SessionError::NoDocument)));
    }

    #[test]
    fn test_check_records_result() {
        let session = CaseSession::default();
        session
            .load_document(Document::from_text("policy.txt", POLICY))
            .unwrap();

        let inputs = CaseInputs {
            different_account_holder: "Ja".to_string(),
            invoice_amount: 120.0,
            ..Default::default()
        };
        let result = check_with_response(
            &session,
            &inputs,
            Some(r#"{"approval":"No","approvedAmount":120,"recommendation":"reject"}"#),
        )
        .unwrap();

        assert_eq!(result.decision.approval(), Approval::No);
        assert_eq!(result.decision.approved_amount(), 0.0);
        assert_eq!(result.evidence.len(), 3);
        assert_eq!(result.generation, 1);
        assert!(session.last_result().is_some());
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let session = CaseSession::default();
        session
            .load_document(Document::from_text("policy.txt", POLICY))
            .unwrap();

        let inputs = CaseInputs {
            invoice_amount: -5.0,
            ..Default::default()
        };
        let err = check_with_response(&session, &inputs, None).unwrap_err();
        assert!(matches!(err, PipelineError::Case(_)));
        assert!(session.last_result().is_none());
    }
}
