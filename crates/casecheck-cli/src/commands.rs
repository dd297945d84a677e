//! Subcommand handlers.
//!
//! Results go to stdout as JSON; logs go to stderr.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use casecheck_core::{
    normalize_with_report, CaseInputs, CaseSession, Chunk, Document, IndexedDocument,
};
use casecheck_runtime::{CaseChecker, ProviderRegistry, RuntimeConfig, StaticProvider};

use crate::cli::ChunkFormat;

/// Characters of chunk text shown per table row.
const PREVIEW_CHARS: usize = 60;

fn load_document(file: &Path) -> anyhow::Result<Document> {
    Document::from_file(file).with_context(|| format!("failed to read {}", file.display()))
}

fn index_document(file: &Path, config: &RuntimeConfig) -> anyhow::Result<IndexedDocument> {
    let document = load_document(file)?;
    IndexedDocument::build(document, &config.pipeline)
        .with_context(|| format!("failed to index {}", file.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn chunk(file: &Path, format: ChunkFormat, config: &RuntimeConfig) -> anyhow::Result<()> {
    let indexed = index_document(file, config)?;
    match format {
        ChunkFormat::Json => {
            for chunk in indexed.chunks() {
                println!("{}", serde_json::to_string(chunk)?);
            }
        }
        ChunkFormat::Table => print!("{}", render_chunk_table(indexed.chunks())),
    }
    tracing::info!(
        chunks = indexed.chunks().len(),
        vocabulary = indexed.index().vocabulary_len(),
        "Chunked document"
    );
    Ok(())
}

fn render_chunk_table(chunks: &[Chunk]) -> String {
    let mut out = format!("{:<12} {:>6} {:>6}  {}\n", "ID", "ORDER", "CHARS", "TEXT");
    for chunk in chunks {
        let chars = chunk.text.chars().count();
        let mut preview: String = chunk.text.chars().take(PREVIEW_CHARS).collect();
        if chars > PREVIEW_CHARS {
            preview.push_str("...");
        }
        out.push_str(&format!(
            "{:<12} {:>6} {:>6}  {}\n",
            casecheck_core::chunk_id(chunk.id),
            chunk.order,
            chars,
            preview
        ));
    }
    out
}

pub fn search(
    file: &Path,
    query: &str,
    top_k: Option<usize>,
    config: &RuntimeConfig,
) -> anyhow::Result<()> {
    let indexed = index_document(file, config)?;
    let top_k = top_k.unwrap_or(config.pipeline.retrieval.top_k);
    let evidence = indexed
        .retrieve(query, top_k)
        .context("retrieval failed")?;
    print_json(&evidence)
}

pub async fn check(
    file: &Path,
    inputs: &Path,
    response: Option<&Path>,
    output: Option<&Path>,
    config: RuntimeConfig,
) -> anyhow::Result<()> {
    let inputs = CaseInputs::from_json_file(inputs)
        .with_context(|| format!("failed to load case inputs from {}", inputs.display()))?;

    let session = CaseSession::new(config.pipeline.clone());
    session.load_document(load_document(file)?)?;

    let checker = match response {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read response from {}", path.display()))?;
            let provider = if content.trim().is_empty() {
                StaticProvider::silent()
            } else {
                StaticProvider::new(content)
            };
            CaseChecker::new(Arc::new(provider), config)
        }
        None => CaseChecker::from_config(config, &ProviderRegistry::with_defaults())
            .context("failed to set up decision provider")?,
    };

    let outcome = checker.check(&session, &inputs).await?;
    if let Some(usage) = outcome.usage {
        tracing::info!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Token usage"
        );
    }

    let json = outcome.result.to_json_pretty();
    println!("{}", json);

    if let Some(path) = output {
        std::fs::write(path, &json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Wrote result");
    }

    Ok(())
}

pub fn normalize(file: Option<&Path>, report: bool) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };

    let normalization = normalize_with_report(Some(raw.as_str()));
    if report {
        print_json(&normalization)
    } else {
        print_json(&normalization.decision)
    }
}
