//! Case inputs and the retrieval query derived from them.
//!
//! Field names on the wire follow the case-management system's variable
//! names (`extRechnungsbetrag`, `sysExternalId`, ...). Unknown fields are
//! carried through untouched so that new variables reach the query and the
//! decision prompt without a code change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors from case input handling.
#[derive(Error, Debug)]
pub enum CaseError {
    #[error("Failed to read case inputs: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse case inputs: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid case input '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Auxiliary data-warehouse lookup attached to a case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DwhLookup {
    /// Whether the case was treated before
    pub previous_treatment: bool,

    /// Amount refunded so far, in EUR
    pub total_refunded_eur: f64,
}

/// Input variables of a case check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CaseInputs {
    #[serde(rename = "extOrdnungsbegriff")]
    pub reference_number: String,

    #[serde(rename = "extLeistungsangebot")]
    pub service_offering: String,

    #[serde(rename = "extRechnungsbetrag")]
    pub invoice_amount: f64,

    /// Invoice date as `YYYY-MM-DD`, or empty when unknown
    #[serde(rename = "extRechnungsdatum")]
    pub invoice_date: String,

    #[serde(rename = "extIBAN")]
    pub iban: String,

    /// Whether the claim is a one-off
    #[serde(rename = "extBVEinmaligkeit")]
    pub one_time_claim: bool,

    #[serde(rename = "sysQueueSelectorName")]
    pub queue_selector_name: String,

    #[serde(rename = "sysExternalId")]
    pub external_id: String,

    #[serde(rename = "extAbweichenderKontoinhaber")]
    pub different_account_holder: String,

    pub dwh: DwhLookup,

    /// Additional variables not modelled above
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl CaseInputs {
    /// Parse inputs from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CaseError> {
        let inputs: CaseInputs = serde_json::from_str(json)?;
        inputs.validate()?;
        Ok(inputs)
    }

    /// Parse inputs from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CaseError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Check amounts and the invoice date.
    pub fn validate(&self) -> Result<(), CaseError> {
        check_amount("extRechnungsbetrag", self.invoice_amount)?;
        check_amount("dwh.total_refunded_eur", self.dwh.total_refunded_eur)?;

        if !self.invoice_date.trim().is_empty() {
            NaiveDate::parse_from_str(self.invoice_date.trim(), "%Y-%m-%d").map_err(|e| {
                CaseError::InvalidField {
                    field: "extRechnungsdatum",
                    reason: format!("expected YYYY-MM-DD ({})", e),
                }
            })?;
        }

        Ok(())
    }

    /// Parsed invoice date, if one is set and valid.
    pub fn invoice_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.invoice_date.trim(), "%Y-%m-%d").ok()
    }

    /// Serialize the inputs into the retrieval query string.
    pub fn to_query(&self) -> String {
        // Serializing plain data with string keys cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Inputs as a JSON value, for prompts and reports.
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

fn check_amount(field: &'static str, value: f64) -> Result<(), CaseError> {
    if !value.is_finite() || value < 0.0 {
        return Err(CaseError::InvalidField {
            field,
            reason: format!("must be a non-negative amount, got {}", value),
        });
    }
    Ok(())
}
