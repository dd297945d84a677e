//! Prompt contract for the decision collaborator.
//!
//! The system prompt is fixed so that providers can cache it. The user
//! prompt carries the dynamic part: the retrieved evidence and the case
//! inputs.

use casecheck_core::{CaseInputs, EvidenceItem};

use crate::providers::ChatMessage;

/// System prompt shared by every case check.
pub const DECISION_SYSTEM_PROMPT: &str = r#"
You check claims against a process description.

You may decide ONLY on the basis of the document passages you are given.
Each passage has an identifier such as chunk-00003.

## Rules
1. Make no assumptions beyond the passages and the case inputs
2. Do not invent rules, limits or amounts
3. If the passages do not settle the case, answer "ManualReview"
4. An approved amount is only allowed when the approval is "Yes"
5. Cite the identifiers of the passages you relied on in the recommendation

## Output Format (JSON only, no prose, no code fences)
{
  "approval": "Yes" | "No" | "ManualReview",
  "approvedAmount": number,
  "recommendation": "short justification citing passage identifiers"
}
"#;

/// Render the evidence list for the user prompt.
pub fn format_evidence(evidence: &[EvidenceItem]) -> String {
    if evidence.is_empty() {
        return "(no passages found)".to_string();
    }

    evidence
        .iter()
        .map(|item| format!("[{}] (score {:.3})\n{}", item.chunk_id, item.score, item.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the user prompt for one case.
pub fn build_user_prompt(inputs: &CaseInputs, evidence: &[EvidenceItem]) -> String {
    let inputs_json =
        serde_json::to_string_pretty(&inputs.to_value()).unwrap_or_else(|_| inputs.to_query());

    format!(
        "## Document passages\n\n{}\n\n## Case inputs\n\n{}\n\nReturn the decision as JSON.",
        format_evidence(evidence),
        inputs_json
    )
}

/// Messages for one decision request.
pub fn build_decision_messages(inputs: &CaseInputs, evidence: &[EvidenceItem]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(DECISION_SYSTEM_PROMPT.trim()),
        ChatMessage::user(build_user_prompt(inputs, evidence)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_names_output_fields() {
        assert!(DECISION_SYSTEM_PROMPT.contains("\"approval\""));
        assert!(DECISION_SYSTEM_PROMPT.contains("\"approvedAmount\""));
        assert!(DECISION_SYSTEM_PROMPT.contains("\"recommendation\""));
        assert!(DECISION_SYSTEM_PROMPT.contains("ManualReview"));
    }

    #[test]
    fn test_user_prompt_carries_evidence_and_inputs() {
        let inputs = CaseInputs {
            reference_number: "ORD-7".to_string(),
            invoice_amount: 99.5,
            ..Default::default()
        };
        let evidence = vec![EvidenceItem::new(3, "Refunds require an invoice.", 0.4242)];

        let prompt = build_user_prompt(&inputs, &evidence);
        assert!(prompt.contains("[chunk-00003] (score 0.424)"));
        assert!(prompt.contains("Refunds require an invoice."));
        assert!(prompt.contains("\"extOrdnungsbegriff\": \"ORD-7\""));
        assert!(prompt.contains("99.5"));
    }

    #[test]
    fn test_messages_order() {
        let messages = build_decision_messages(&CaseInputs::default(), &[]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.contains("(no passages found)"));
    }
}
