//! The validated decision type.

use serde::Serialize;
use std::fmt;

/// Approval outcome of a case check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Approval {
    Yes,
    No,
    ManualReview,
}

impl Approval {
    /// Interpret a free-text approval value.
    ///
    /// Matching ignores case, whitespace, underscores and hyphens, and
    /// accepts the German labels used by the case-management system.
    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "yes" | "ja" | "approved" | "genehmigt" => Some(Self::Yes),
            "no" | "nein" | "rejected" | "declined" | "abgelehnt" => Some(Self::No),
            "manualreview" | "manual" | "review" | "manuelleprüfung" | "manuellepruefung" => {
                Some(Self::ManualReview)
            }
            _ => None,
        }
    }

    /// Wire name of the approval.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::ManualReview => "ManualReview",
        }
    }
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision that satisfies the output contract.
///
/// Only the normalizer builds these, so an amount above zero always comes
/// with `Approval::Yes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionOutput {
    approval: Approval,

    #[serde(rename = "approvedAmount")]
    approved_amount: f64,

    recommendation: String,
}

impl DecisionOutput {
    /// Build a decision, forcing the amount invariant.
    pub(crate) fn new(approval: Approval, amount: f64, recommendation: String) -> Self {
        let approved_amount = match approval {
            Approval::Yes if amount.is_finite() && amount > 0.0 => amount,
            _ => 0.0,
        };
        Self {
            approval,
            approved_amount,
            recommendation,
        }
    }

    /// The canonical manual-review fallback.
    pub fn manual_review(recommendation: impl Into<String>) -> Self {
        Self::new(Approval::ManualReview, 0.0, recommendation.into())
    }

    pub fn approval(&self) -> Approval {
        self.approval
    }

    pub fn approved_amount(&self) -> f64 {
        self.approved_amount
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }

    /// Whether this decision sends the case to a human.
    pub fn needs_manual_review(&self) -> bool {
        self.approval == Approval::ManualReview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_english_and_german() {
        assert_eq!(Approval::parse("Yes"), Some(Approval::Yes));
        assert_eq!(Approval::parse(" ja "), Some(Approval::Yes));
        assert_eq!(Approval::parse("NEIN"), Some(Approval::No));
        assert_eq!(Approval::parse("Manual_Review"), Some(Approval::ManualReview));
        assert_eq!(Approval::parse("Manuelle Prüfung"), Some(Approval::ManualReview));
        assert_eq!(Approval::parse("maybe"), None);
    }

    #[test]
    fn test_amount_only_with_yes() {
        assert_eq!(DecisionOutput::new(Approval::Yes, 10.0, String::new()).approved_amount(), 10.0);
        assert_eq!(DecisionOutput::new(Approval::No, 10.0, String::new()).approved_amount(), 0.0);
        assert_eq!(DecisionOutput::new(Approval::Yes, -3.0, String::new()).approved_amount(), 0.0);
        assert_eq!(
            DecisionOutput::new(Approval::Yes, f64::INFINITY, String::new()).approved_amount(),
            0.0
        );
    }

    #[test]
    fn test_serialized_shape() {
        let decision = DecisionOutput::new(Approval::Yes, 150.0, "ok".to_string());
        assert_eq!(
            serde_json::to_string(&decision).unwrap(),
            r#"{"approval":"Yes","approvedAmount":150.0,"recommendation":"ok"}"#
        );
    }
}
