//! # papersum
//!
//! Batch-summarize academic PDF and DOCX documents using hosted LLM
//! completion endpoints.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / DOCX
//!  │
//!  ├─ 1. Extract  native text per page, OCR fallback for scanned pages
//!  ├─ 2. Chunk    budget-bounded spans at paragraph/sentence boundaries
//!  ├─ 3. Summarize concurrent per-chunk completion calls + one merge call
//!  ├─ 4. Cache    (content fingerprint, mode) → summary, write-through
//!  └─ 5. Export   Markdown per document, zip archive per batch
//! ```
//!
//! Summaries come in three modes — concise (~800 words), standard (~1500)
//! and detailed (~2500) — and can carry a mind-map outline derived from the
//! summary structure. Each document in a batch succeeds or fails
//! independently: a corrupt file or an exhausted retry budget degrades or
//! fails that document only.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use papersum::{summarize, SummaryConfig, SummaryMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / DEEPSEEK_API_KEY
//!     let config = SummaryConfig::builder()
//!         .mode(SummaryMode::Concise)
//!         .build()?;
//!     let summary = summarize("paper.pdf", config).await?;
//!     println!("{}", summary.text);
//!     eprintln!(
//!         "tokens: {} in / {} out",
//!         summary.stats.prompt_tokens, summary.stats.completion_tokens
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `papersum` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! papersum = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cache::SummaryCache;
pub use config::{ModeBudgets, SummaryConfig, SummaryConfigBuilder, SummaryMode};
pub use document::{Document, DocumentFormat, ExtractedText, ExtractionMethod};
pub use error::{PipelineWarning, SummarizeError};
pub use output::{DocumentStatus, Outline, OutlineNode, Summary, SummaryStats};
pub use prompts::PromptSet;
pub use provider::{
    CompletionProvider, CompletionRequest, CompletionResponse, OpenAiCompatible, ProviderError,
};
pub use summarize::{summarize, BatchItem, CancelToken, Summarizer};
