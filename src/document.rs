//! Input document model: raw bytes, detected format, fingerprinting, and the
//! page-tagged text produced by extraction.
//!
//! The fingerprint is a hex SHA-256 of the raw bytes, not the filename, so
//! identical content reuses cached summaries regardless of what the file is
//! called on disk.

use crate::error::SummarizeError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Detect the format from magic bytes, falling back to the extension.
    ///
    /// PDF files start with `%PDF`; DOCX files are zip archives (`PK\x03\x04`).
    /// Plain `.doc` (pre-2007 OLE) is not a zip and is rejected.
    pub fn detect(name: &str, bytes: &[u8]) -> Result<Self, SummarizeError> {
        if bytes.starts_with(b"%PDF") {
            return Ok(DocumentFormat::Pdf);
        }
        if bytes.starts_with(b"PK\x03\x04") && has_extension(name, &["docx"]) {
            return Ok(DocumentFormat::Docx);
        }
        // Extension-only fallback for files with unusual preambles.
        if has_extension(name, &["pdf"]) && bytes.windows(4).take(1024).any(|w| w == b"%PDF") {
            return Ok(DocumentFormat::Pdf);
        }
        Err(SummarizeError::UnsupportedFormat {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

fn has_extension(name: &str, exts: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| exts.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// An uploaded document awaiting summarization.
///
/// Created from a path or raw bytes; discarded after the pipeline run
/// completes (only the [`crate::output::Summary`] survives, in the cache).
#[derive(Debug, Clone)]
pub struct Document {
    /// Display name, usually the filename. Not part of the cache key.
    pub name: String,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
    /// Detected format.
    pub format: DocumentFormat,
}

impl Document {
    /// Build a document from in-memory bytes, detecting the format.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, SummarizeError> {
        let name = name.into();
        let format = DocumentFormat::detect(&name, &bytes)?;
        Ok(Self {
            name,
            bytes,
            format,
        })
    }

    /// Read a document from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SummarizeError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|_| SummarizeError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        Self::from_bytes(name, bytes)
    }

    /// Content fingerprint: hex SHA-256 of the raw bytes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

/// How the text of a page was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    /// Text layer read directly from the file.
    Native,
    /// Page rasterised and recognised via OCR.
    Ocr,
}

/// Text of one page, tagged with how it was extracted.
#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-indexed page number. DOCX documents have a single logical page.
    pub page_num: usize,
    pub text: String,
    pub method: ExtractionMethod,
}

/// Ordered page-level text segments for one document.
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub pages: Vec<PageText>,
}

impl ExtractedText {
    /// Total character count across all pages.
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }

    /// True when no page carries any non-whitespace text.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }

    /// Number of pages extracted via OCR.
    pub fn ocr_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.method == ExtractionMethod::Ocr)
            .count()
    }
}

/// A bounded contiguous span of extracted text, submitted as one
/// summarization unit.
///
/// Chunks partition the extracted text: concatenating `text` in `index`
/// order reproduces the input modulo boundary whitespace normalization.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position in the ordered chunk sequence (0-indexed).
    pub index: usize,
    pub text: String,
    /// Inclusive 1-indexed source page range (start, end).
    pub pages: (usize, usize),
}
