//! Output types: the final [`Summary`], its statistics, the mind-map
//! [`Outline`], and per-document batch status.

use crate::config::SummaryMode;
use crate::error::PipelineWarning;
use serde::{Deserialize, Serialize};

/// A finished summary for one document.
///
/// Cached keyed by `(fingerprint, mode)`; see [`crate::cache::SummaryCache`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Final summary text, Markdown.
    pub text: String,
    /// Optional mind-map outline derived from the summary.
    pub outline: Option<Outline>,
    /// Mode the summary was produced under.
    pub mode: SummaryMode,
    /// Content fingerprint of the source document.
    pub fingerprint: String,
    /// Display name of the source document at summarization time.
    pub source_name: String,
    /// Non-fatal degradations collected during the run.
    pub warnings: Vec<PipelineWarning>,
    /// True when at least one chunk's contribution was omitted after retry
    /// exhaustion.
    pub degraded: bool,
    /// Run statistics.
    pub stats: SummaryStats,
}

impl Summary {
    /// Per-document status for batch reporting.
    pub fn status(&self) -> DocumentStatus {
        if self.warnings.is_empty() {
            DocumentStatus::Succeeded
        } else {
            DocumentStatus::SucceededWithWarnings
        }
    }
}

/// Statistics for one summarization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages whose text came from OCR.
    pub ocr_pages: usize,
    /// Chunks produced by the splitter.
    pub total_chunks: usize,
    /// Chunks whose contribution was dropped after retry exhaustion.
    pub omitted_chunks: usize,
    /// Completion calls actually issued (zero on a cache hit).
    pub completion_calls: usize,
    /// Prompt tokens across all completion calls.
    pub prompt_tokens: u64,
    /// Completion tokens across all completion calls.
    pub completion_tokens: u64,
    /// Wall-clock duration of extraction + chunking in milliseconds.
    pub extract_duration_ms: u64,
    /// Wall-clock duration of all completion calls in milliseconds.
    pub llm_duration_ms: u64,
    /// Total pipeline duration in milliseconds.
    pub total_duration_ms: u64,
    /// True when the summary was served from the cache.
    pub cache_hit: bool,
}

/// Per-document outcome reported for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Succeeded,
    SucceededWithWarnings,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Succeeded => "succeeded",
            DocumentStatus::SucceededWithWarnings => "succeeded-with-warnings",
            DocumentStatus::Failed => "failed",
        }
    }
}

/// Hierarchical topic outline ("mind map") derived from a summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    /// Root label, usually the document name.
    pub root: String,
    /// Top-level topic nodes.
    pub nodes: Vec<OutlineNode>,
}

/// One topic node with optional children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub label: String,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineWarning;

    fn summary_with_warnings(warnings: Vec<PipelineWarning>) -> Summary {
        Summary {
            text: "body".into(),
            outline: None,
            mode: SummaryMode::Standard,
            fingerprint: "f".repeat(64),
            source_name: "paper.pdf".into(),
            degraded: false,
            warnings,
            stats: SummaryStats::default(),
        }
    }

    #[test]
    fn status_reflects_warnings() {
        assert_eq!(
            summary_with_warnings(vec![]).status(),
            DocumentStatus::Succeeded
        );
        let w = PipelineWarning::ExtractionDegraded {
            page: 1,
            detail: "no ocr".into(),
        };
        assert_eq!(
            summary_with_warnings(vec![w]).status(),
            DocumentStatus::SucceededWithWarnings
        );
    }
}
