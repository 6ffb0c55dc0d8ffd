//! Error types for the papersum library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`SummarizeError`] — **Fatal for one document**: the pipeline cannot
//!   produce any summary for that document (invalid input, no provider,
//!   every chunk lost). Returned as `Err(SummarizeError)` from the
//!   top-level `summarize*` functions. In a batch, a fatal error for one
//!   document never stops its siblings.
//!
//! * [`PipelineWarning`] — **Non-fatal**: a page was extracted without OCR,
//!   or a single chunk was dropped after retry exhaustion. Stored inside
//!   [`crate::output::Summary::warnings`] so callers can inspect partial
//!   success rather than losing the whole document to one bad chunk.
//!
//! Validation errors (size, page count, format) are raised before any
//! completion call is issued, so a rejected document costs no API spend.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the papersum library.
///
/// Chunk-level and page-level degradations use [`PipelineWarning`] and are
/// stored in [`crate::output::Summary`] rather than propagated here.
#[derive(Debug, Error)]
pub enum SummarizeError {
    // ── Input validation ──────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file extension / magic bytes match neither PDF nor DOCX.
    #[error("Unsupported format for '{name}': only PDF and DOCX are accepted")]
    UnsupportedFormat { name: String },

    /// The document could not be parsed by its format's extractor.
    #[error("Document '{name}' is corrupt or unreadable: {detail}")]
    CorruptFile { name: String, detail: String },

    /// Raw size exceeds the configured limit (default 50 MB).
    #[error("Document '{name}' is {size} bytes, over the {limit} byte limit")]
    SizeLimitExceeded { name: String, size: u64, limit: u64 },

    /// Page count exceeds the configured limit (default 100).
    #[error("Document '{name}' has {pages} pages, over the {limit} page limit")]
    PageLimitExceeded {
        name: String,
        pages: usize,
        limit: usize,
    },

    /// Extraction produced no usable text at all.
    #[error("Document '{name}' contains no extractable text")]
    EmptyDocument { name: String },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("Completion provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Every chunk was lost, or the merge call failed after retries.
    #[error("Summarization failed for '{name}': {detail}")]
    SummarizationFailed { name: String, detail: String },

    /// The batch was cancelled before this document's pipeline started.
    #[error("Batch cancelled before '{name}' started")]
    Cancelled { name: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Could not write a Markdown file or the batch archive.
    #[error("Failed to write export '{path}': {source}")]
    ExportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal degradation recorded against a single document's summary.
///
/// The overall summarization continues; callers inspect
/// [`crate::output::Summary::warnings`] to decide how much to trust the
/// result.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PipelineWarning {
    /// OCR was wanted for a low-density page but was unavailable or failed,
    /// so the page kept its (possibly sparse) native text.
    #[error("Page {page}: extraction degraded: {detail}")]
    ExtractionDegraded { page: usize, detail: String },

    /// A chunk's completion call exhausted all retries and its contribution
    /// was omitted from the final summary.
    #[error("Chunk {index}: omitted after {retries} retries: {detail}")]
    ChunkOmitted {
        index: usize,
        retries: u32,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_display() {
        let e = SummarizeError::SizeLimitExceeded {
            name: "big.pdf".into(),
            size: 60_000_000,
            limit: 52_428_800,
        };
        let msg = e.to_string();
        assert!(msg.contains("big.pdf"), "got: {msg}");
        assert!(msg.contains("60000000"), "got: {msg}");
    }

    #[test]
    fn page_limit_display() {
        let e = SummarizeError::PageLimitExceeded {
            name: "long.pdf".into(),
            pages: 180,
            limit: 100,
        };
        assert!(e.to_string().contains("180 pages"));
    }

    #[test]
    fn chunk_omitted_display() {
        let w = PipelineWarning::ChunkOmitted {
            index: 2,
            retries: 3,
            detail: "rate limited".into(),
        };
        let msg = w.to_string();
        assert!(msg.contains("Chunk 2"));
        assert!(msg.contains("3 retries"));
    }

    #[test]
    fn extraction_degraded_display() {
        let w = PipelineWarning::ExtractionDegraded {
            page: 7,
            detail: "tesseract not installed".into(),
        };
        assert!(w.to_string().contains("Page 7"));
    }
}
