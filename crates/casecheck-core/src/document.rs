//! Uploaded process-description documents.
//!
//! Text extraction is deliberately shallow: TXT files are decoded lossily and
//! PDF files are reduced to their page text. Extraction quality is not
//! validated; whatever text comes out is what gets chunked.

use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use thiserror::Error;

/// Errors from document loading and text extraction.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to read document: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported file type '{0}'. Please upload PDF or TXT.")]
    UnsupportedFormat(String),

    #[error("PDF support is not enabled; rebuild with the 'pdf' feature")]
    PdfSupportDisabled,

    #[error("PDF extraction failed: {0}")]
    PdfExtraction(String),
}

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Txt,
}

impl DocumentFormat {
    /// Resolve a format from a bare extension (`"pdf"`, `".TXT"`, ...).
    pub fn from_extension(ext: &str) -> Result<Self, DocumentError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Txt),
            other => Err(DocumentError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Resolve a format from a file name or path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| DocumentError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_extension(ext)
    }
}

/// Extract text from raw file bytes.
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String, DocumentError> {
    match format {
        DocumentFormat::Txt => Ok(String::from_utf8_lossy(bytes)
            .replace('\u{FFFD}', "")
            .trim()
            .to_string()),
        DocumentFormat::Pdf => extract_pdf(bytes),
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> Result<String, DocumentError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map(|text| text.trim().to_string())
        .map_err(|e| DocumentError::PdfExtraction(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: &[u8]) -> Result<String, DocumentError> {
    Err(DocumentError::PdfSupportDisabled)
}

/// An uploaded document: immutable extracted text plus identity.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// File name or label the text came from
    pub source: String,

    /// Extracted text
    pub text: String,

    /// Hash of the text, stable within a process
    pub fingerprint: u64,
}

impl Document {
    /// Wrap already-extracted text.
    pub fn from_text(source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        Self {
            source: source.into(),
            fingerprint: hasher.finish(),
            text,
        }
    }

    /// Extract a document from bytes with a declared extension.
    pub fn from_bytes(
        source: impl Into<String>,
        bytes: &[u8],
        extension: &str,
    ) -> Result<Self, DocumentError> {
        let format = DocumentFormat::from_extension(extension)?;
        let text = extract_text(bytes, format)?;
        Ok(Self::from_text(source, text))
    }

    /// Read and extract a document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let bytes = fs::read(path)?;
        let text = extract_text(&bytes, format)?;
        tracing::debug!(path = %path.display(), chars = text.chars().count(), "Extracted document text");
        Ok(Self::from_text(path.display().to_string(), text))
    }

    /// Number of characters in the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// First `n` characters of the text, for previews.
    pub fn preview(&self, n: usize) -> String {
        self.text.chars().take(n).collect()
    }
}
