//! Decision validation.
//!
//! The decision collaborator returns untrusted text. This module turns it
//! into a `DecisionOutput` that always satisfies the wire contract, and
//! checks serialized decisions against the embedded JSON Schema.

mod normalizer;
mod output;
mod schema;

pub use normalizer::{
    normalize, normalize_with_report, Disposition, Normalization, NO_OUTPUT_RECOMMENDATION,
    UNPARSEABLE_RECOMMENDATION,
};
pub use output::{Approval, DecisionOutput};
pub use schema::{is_valid_decision, validate_decision_schema, SchemaError};
