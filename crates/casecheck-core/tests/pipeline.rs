//! End-to-end behavior of the retrieval and normalization pipeline.

use casecheck_core::{
    check_with_response, chunk_text, normalize, retrieve, Approval, CaseInputs, CaseSession,
    ChunkingConfig, Document, IndexConfig, SearchIndex, UNPARSEABLE_RECOMMENDATION,
};

fn sample_text() -> String {
    format!("A. B. {}. {}.", "X".repeat(90), "Y".repeat(90))
}

#[test]
fn short_sentences_are_dropped_and_query_ranks_matching_chunk() {
    let text = sample_text();
    let chunks = chunk_text(&text, &ChunkingConfig::default()).unwrap();

    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].text.starts_with('X'));
    assert!(chunks[1].text.starts_with('Y'));

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let index = SearchIndex::build(&texts, &IndexConfig::default()).unwrap();

    let evidence = retrieve(&index, &chunks, &"X".repeat(90), 2).unwrap();
    assert_eq!(evidence.len(), 2);
    assert!(evidence[0].text.starts_with('X'));
    assert!(evidence[0].score > evidence[1].score);
}

#[test]
fn string_amount_is_coerced() {
    let decision = normalize(Some(
        r#"{"approval":"Yes","approvedAmount":"150","recommendation":"ok"}"#,
    ));
    assert_eq!(
        serde_json::to_string(&decision).unwrap(),
        r#"{"approval":"Yes","approvedAmount":150.0,"recommendation":"ok"}"#
    );
}

#[test]
fn amount_is_forced_to_zero_without_approval() {
    let decision = normalize(Some(r#"{"approval":"No","approvedAmount":200}"#));
    assert_eq!(decision.approval(), Approval::No);
    assert_eq!(decision.approved_amount(), 0.0);
}

#[test]
fn non_json_falls_back_to_manual_review() {
    let decision = normalize(Some("not json"));
    assert_eq!(decision.approval(), Approval::ManualReview);
    assert_eq!(decision.approved_amount(), 0.0);
    assert_eq!(decision.recommendation(), UNPARSEABLE_RECOMMENDATION);
}

#[test]
fn session_check_uses_uploaded_document() {
    let session = CaseSession::default();
    session
        .load_document(Document::from_text("process.txt", sample_text()))
        .unwrap();

    let inputs = CaseInputs {
        reference_number: "Y".repeat(90),
        invoice_amount: 80.0,
        ..Default::default()
    };
    let result = check_with_response(&session, &inputs, Some("```json\n{\"approval\":\"ja\"}\n```"))
        .unwrap();

    assert_eq!(result.decision.approval(), Approval::Yes);
    assert_eq!(result.evidence.len(), 2);
    assert_eq!(result.evidence[0].chunk_id, "chunk-00001");
    assert_eq!(result.document, "process.txt");

    let json: serde_json::Value = serde_json::from_str(&result.to_json_pretty()).unwrap();
    assert_eq!(json["decision"]["approval"], "Yes");
    assert_eq!(json["inputs"]["extRechnungsbetrag"], 80.0);
}

#[test]
fn replacing_the_document_changes_the_evidence() {
    let session = CaseSession::default();
    session
        .load_document(Document::from_text("first.txt", sample_text()))
        .unwrap();
    session
        .load_document(Document::from_text("second.txt", "just one short line"))
        .unwrap();

    let evidence = session.retrieve("short line").unwrap();
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].text, "just one short line");
    assert!(evidence[0].score > 0.0);
}
