//! Decision normalizer: untrusted collaborator text in, valid decision out.
//!
//! The normalizer is a total function. Absent output, unparseable output and
//! partially filled payloads all end in a valid `DecisionOutput`; nothing is
//! passed through unchecked and no error ever reaches the caller. When in
//! doubt the result is a manual review.
//!
//! | Raw response | Result |
//! |--------------|--------|
//! | `None`, empty, whitespace | ManualReview, "no decision output received." |
//! | not a JSON object | ManualReview, "output was not valid structured data." |
//! | JSON object | fields extracted with per-field defaults |

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::output::{Approval, DecisionOutput};

/// Recommendation used when the collaborator produced nothing.
pub const NO_OUTPUT_RECOMMENDATION: &str = "no decision output received.";

/// Recommendation used when the output could not be parsed.
pub const UNPARSEABLE_RECOMMENDATION: &str = "output was not valid structured data.";

const APPROVAL_KEYS: &[&str] = &["approval", "Genehmigung"];
const AMOUNT_KEYS: &[&str] = &["approvedAmount", "Genehmigungsbetrag"];
const RECOMMENDATION_KEYS: &[&str] = &["recommendation", "Empfehlung"];

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*(.*?)\s*```$").unwrap();

    /// Integer amounts grouped with dots, as in `1.500` or `1.250.000`.
    static ref DOT_GROUPED: Regex = Regex::new(r"^-?\d{1,3}(\.\d{3})+$").unwrap();
}

/// How the raw response was turned into a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// All fields were present and valid
    Accepted,

    /// The payload was usable but some fields were defaulted or repaired
    Coerced { notes: Vec<String> },

    /// Nothing was received
    Missing,

    /// Something was received but it was not a JSON object
    Unparseable,
}

impl Disposition {
    /// Whether the decision is the canonical fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Missing | Self::Unparseable)
    }
}

/// A normalized decision together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalization {
    pub decision: DecisionOutput,
    pub disposition: Disposition,
}

/// Normalize a raw collaborator response into a valid decision.
pub fn normalize(raw: Option<&str>) -> DecisionOutput {
    normalize_with_report(raw).decision
}

/// Normalize and report what had to be repaired.
pub fn normalize_with_report(raw: Option<&str>) -> Normalization {
    let text = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => {
            return Normalization {
                decision: DecisionOutput::manual_review(NO_OUTPUT_RECOMMENDATION),
                disposition: Disposition::Missing,
            }
        }
    };

    match parse_object(text) {
        Some(payload) => extract(&payload),
        None => Normalization {
            decision: DecisionOutput::manual_review(UNPARSEABLE_RECOMMENDATION),
            disposition: Disposition::Unparseable,
        },
    }
}

/// Parse the text as a JSON object, tolerating a surrounding code fence.
fn parse_object(text: &str) -> Option<Map<String, JsonValue>> {
    let body = CODE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str());

    match serde_json::from_str::<JsonValue>(body) {
        Ok(JsonValue::Object(map)) => Some(map),
        _ => None,
    }
}

/// First present, non-null value under any of `keys`.
fn field<'a>(payload: &'a Map<String, JsonValue>, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| !value.is_null())
}

fn extract(payload: &Map<String, JsonValue>) -> Normalization {
    let mut notes = Vec::new();

    let approval = match field(payload, APPROVAL_KEYS) {
        None => {
            notes.push("approval missing; defaulted to ManualReview".to_string());
            Approval::ManualReview
        }
        Some(JsonValue::String(s)) => Approval::parse(s).unwrap_or_else(|| {
            notes.push(format!("unrecognized approval '{}'; defaulted to ManualReview", s));
            Approval::ManualReview
        }),
        Some(other) => {
            notes.push(format!("approval must be a string, got {}; defaulted to ManualReview", other));
            Approval::ManualReview
        }
    };

    let raw_amount = match field(payload, AMOUNT_KEYS) {
        None => {
            if approval == Approval::Yes {
                notes.push("approvedAmount missing; defaulted to 0".to_string());
            }
            0.0
        }
        Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(JsonValue::String(s)) => match parse_amount(s) {
            Some(amount) => {
                notes.push("approvedAmount given as text".to_string());
                amount
            }
            None => {
                notes.push(format!("approvedAmount '{}' is not numeric; defaulted to 0", s));
                0.0
            }
        },
        Some(other) => {
            notes.push(format!("approvedAmount must be numeric, got {}; defaulted to 0", other));
            0.0
        }
    };

    if raw_amount < 0.0 {
        notes.push(format!("negative approvedAmount {} clamped to 0", raw_amount));
    } else if raw_amount > 0.0 && approval != Approval::Yes {
        notes.push(format!(
            "approvedAmount {} discarded because approval is {}",
            raw_amount, approval
        ));
    }

    let recommendation = match field(payload, RECOMMENDATION_KEYS) {
        None => {
            notes.push("recommendation missing".to_string());
            String::new()
        }
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => {
            notes.push("recommendation was not text".to_string());
            other.to_string()
        }
    };

    let decision = DecisionOutput::new(approval, raw_amount, recommendation);
    let disposition = if notes.is_empty() {
        Disposition::Accepted
    } else {
        Disposition::Coerced { notes }
    };

    Normalization {
        decision,
        disposition,
    }
}

/// Parse an amount written as text (`"150"`, `"99,90"`, `"1.500,00 EUR"`).
///
/// When both separators appear the last one is the decimal mark. A lone
/// comma is a decimal comma; dots in `d.ddd` groups are thousands separators.
fn parse_amount(text: &str) -> Option<f64> {
    let trimmed = text
        .trim()
        .trim_end_matches("EUR")
        .trim_end_matches('€')
        .trim();

    let candidate = match (trimmed.rfind(','), trimmed.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => trimmed.replace('.', "").replacen(',', ".", 1),
        (Some(_), Some(_)) => trimmed.replace(',', ""),
        (Some(_), None) if trimmed.matches(',').count() == 1 => trimmed.replacen(',', ".", 1),
        (Some(_), None) => trimmed.replace(',', ""),
        (None, Some(_)) if DOT_GROUPED.is_match(trimmed) => trimmed.replace('.', ""),
        _ => trimmed.to_string(),
    };

    candidate.parse::<f64>().ok().filter(|v| v.is_finite())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_json() -> impl Strategy<Value = JsonValue> {
        let leaf = prop_oneof![
            Just(JsonValue::Null),
            any::<bool>().prop_map(JsonValue::from),
            any::<i64>().prop_map(JsonValue::from),
            (-1.0e9f64..1.0e9).prop_map(JsonValue::from),
            "[A-Za-z0-9 ,.-]{0,12}".prop_map(JsonValue::from),
            prop::sample::select(vec!["Yes", "No", "ManualReview", "Ja", "Nein"])
                .prop_map(JsonValue::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map(
                prop::sample::select(vec![
                    "approval".to_string(),
                    "approvedAmount".to_string(),
                    "recommendation".to_string(),
                    "other".to_string(),
                ]),
                inner,
                0..4,
            )
            .prop_map(|m| JsonValue::Object(m.into_iter().collect()))
        })
    }

    proptest! {
        #[test]
        fn any_text_yields_valid_decision(raw in proptest::option::of(".{0,64}")) {
            let decision = normalize(raw.as_deref());
            prop_assert!(decision.approved_amount() >= 0.0);
            if decision.approval() != Approval::Yes {
                prop_assert_eq!(decision.approved_amount(), 0.0);
            }
        }

        #[test]
        fn any_payload_respects_amount_invariant(payload in arb_json()) {
            let raw = payload.to_string();
            let decision = normalize(Some(&raw));
            prop_assert!(decision.approved_amount() >= 0.0);
            prop_assert!(decision.approved_amount().is_finite());
            if decision.approval() != Approval::Yes {
                prop_assert_eq!(decision.approved_amount(), 0.0);
            }
        }
    }
}
