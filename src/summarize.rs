//! Summarization entry points: single documents, batches, cancellation.
//!
//! [`Summarizer`] owns the resolved provider and the write-through summary
//! cache, so repeated runs over the same content reuse results across calls.
//! The free [`summarize`] function is the one-shot convenience wrapper for
//! callers who do not need a shared cache.
//!
//! ## Concurrency model
//!
//! Documents in a batch are independent pipelines run via `buffer_unordered`
//! up to `config.concurrency`; a fatal error in one never stops its
//! siblings. Within one document, chunk completion calls run up to
//! `config.chunk_concurrency`, and the merge call is the join point that
//! waits for every chunk outcome. The only shared mutable state across
//! documents is the cache, which publishes entries atomically.

use crate::cache::SummaryCache;
use crate::config::SummaryConfig;
use crate::document::Document;
use crate::error::{PipelineWarning, SummarizeError};
use crate::output::{DocumentStatus, Summary, SummaryStats};
use crate::pipeline::{chunk, extract, llm, outline};
use crate::provider::{self, CompletionProvider};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Cooperative cancellation flag for a batch.
///
/// Cancelling stops dispatch of not-yet-started document pipelines;
/// in-flight pipelines run to completion, so cache entries are never
/// half-written.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Per-document outcome of a batch run, in input order.
pub struct BatchItem {
    pub name: String,
    pub result: Result<Arc<Summary>, SummarizeError>,
}

impl BatchItem {
    /// Collapsed status for result listings.
    pub fn status(&self) -> DocumentStatus {
        match &self.result {
            Ok(summary) => summary.status(),
            Err(_) => DocumentStatus::Failed,
        }
    }
}

/// Document summarization driver: resolved provider + shared cache.
pub struct Summarizer {
    config: SummaryConfig,
    provider: Arc<dyn CompletionProvider>,
    cache: SummaryCache,
}

impl Summarizer {
    /// Build a summarizer, resolving the completion provider.
    ///
    /// Resolution order, most-specific first:
    /// 1. a pre-built provider in `config.provider`;
    /// 2. `config.provider_name` plus the matching API key variable;
    /// 3. auto-detection from `OPENAI_API_KEY` / `DEEPSEEK_API_KEY`.
    pub fn new(config: SummaryConfig) -> Result<Self, SummarizeError> {
        let provider: Arc<dyn CompletionProvider> = match (&config.provider, &config.provider_name)
        {
            (Some(provider), _) => Arc::clone(provider),
            (None, Some(name)) => Arc::new(provider::create_provider(
                name,
                config.model.clone(),
                config.api_base.clone(),
                config.api_timeout_secs,
            )?),
            (None, None) => Arc::new(provider::provider_from_env(
                config.model.clone(),
                config.api_base.clone(),
                config.api_timeout_secs,
            )?),
        };
        info!(provider = provider.name(), mode = %config.mode, "summarizer ready");
        let cache = SummaryCache::with_capacity(config.cache_capacity);
        Ok(Self {
            config,
            provider,
            cache,
        })
    }

    /// The write-through cache, for inspection in tests and callers that
    /// want hit statistics.
    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    /// Summarize a document read from disk.
    pub async fn summarize_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<Summary>, SummarizeError> {
        let doc = Document::from_path(path).await?;
        self.summarize_document(&doc).await
    }

    /// Summarize in-memory bytes.
    pub async fn summarize_bytes(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Arc<Summary>, SummarizeError> {
        let doc = Document::from_bytes(name, bytes)?;
        self.summarize_document(&doc).await
    }

    /// Run the full pipeline for one document.
    ///
    /// Consults the cache first: an unchanged document in the same mode is
    /// served without issuing any completion call.
    pub async fn summarize_document(
        &self,
        doc: &Document,
    ) -> Result<Arc<Summary>, SummarizeError> {
        let total_start = Instant::now();
        let fingerprint = doc.fingerprint();

        if let Some(cached) = self.cache.get(&fingerprint, self.config.mode) {
            debug!(document = %doc.name, "cache hit, no completion calls issued");
            let mut summary = (*cached).clone();
            summary.stats.cache_hit = true;
            return Ok(Arc::new(summary));
        }

        info!(document = %doc.name, format = doc.format.as_str(), "starting summarization");

        // ── Extract & chunk (fails fast before any API spend) ────────────
        let extract_start = Instant::now();
        let extraction = extract::extract(doc, &self.config).await?;
        let chunks = chunk::split_chunks(&extraction.text, self.config.chunk_size);
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        if chunks.is_empty() {
            return Err(SummarizeError::EmptyDocument {
                name: doc.name.clone(),
            });
        }
        debug!(
            document = %doc.name,
            chunks = chunks.len(),
            chars = extraction.text.char_count(),
            "chunking complete"
        );

        // ── Per-chunk completion calls ───────────────────────────────────
        let llm_start = Instant::now();
        let total_chars = extraction.text.char_count();
        let mut outcomes: Vec<llm::ChunkOutcome> = stream::iter(chunks.iter().map(|c| {
            let provider = Arc::clone(&self.provider);
            async move { llm::summarize_chunk(&provider, c, total_chars, &self.config).await }
        }))
        .buffer_unordered(self.config.chunk_concurrency)
        .collect()
        .await;
        outcomes.sort_by_key(|o| o.index);

        let mut warnings = extraction.warnings;
        let mut partials = Vec::with_capacity(outcomes.len());
        let mut completion_calls = 0usize;
        let mut prompt_tokens = 0u64;
        let mut completion_tokens = 0u64;
        let mut omitted = 0usize;
        let mut first_error = None;

        for outcome in outcomes {
            completion_calls += outcome.calls;
            prompt_tokens += outcome.prompt_tokens;
            completion_tokens += outcome.completion_tokens;
            match outcome.partial {
                Some(partial) => partials.push(partial),
                None => {
                    omitted += 1;
                    let detail = outcome.error.unwrap_or_else(|| "unknown error".to_string());
                    if first_error.is_none() {
                        first_error = Some(detail.clone());
                    }
                    warn!(document = %doc.name, chunk = outcome.index, "chunk omitted: {detail}");
                    warnings.push(PipelineWarning::ChunkOmitted {
                        index: outcome.index,
                        retries: outcome.retries,
                        detail,
                    });
                }
            }
        }

        if partials.is_empty() {
            return Err(SummarizeError::SummarizationFailed {
                name: doc.name.clone(),
                detail: format!(
                    "all {} chunks failed; first error: {}",
                    omitted,
                    first_error.unwrap_or_else(|| "unknown".to_string())
                ),
            });
        }

        // ── Merge (single-chunk documents skip the extra call) ───────────
        let text = if partials.len() == 1 {
            partials.into_iter().next().unwrap_or_default()
        } else {
            match llm::merge_partials(&self.provider, &partials, &self.config).await {
                Ok(attempt) => {
                    completion_calls += attempt.calls;
                    prompt_tokens += attempt.response.prompt_tokens;
                    completion_tokens += attempt.response.completion_tokens;
                    attempt.response.text
                }
                Err(failed) => {
                    return Err(SummarizeError::SummarizationFailed {
                        name: doc.name.clone(),
                        detail: format!("merge call failed: {}", failed.error),
                    })
                }
            }
        };
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

        let outline = self
            .config
            .outline
            .then(|| outline::build_outline(&doc.name, &text, self.config.outline_max_label));

        let summary = Arc::new(Summary {
            text,
            outline,
            mode: self.config.mode,
            fingerprint: fingerprint.clone(),
            source_name: doc.name.clone(),
            degraded: omitted > 0,
            warnings,
            stats: SummaryStats {
                total_pages: extraction.text.pages.len(),
                ocr_pages: extraction.text.ocr_pages(),
                total_chunks: chunks.len(),
                omitted_chunks: omitted,
                completion_calls,
                prompt_tokens,
                completion_tokens,
                extract_duration_ms,
                llm_duration_ms,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
                cache_hit: false,
            },
        });

        // Atomic publish: the full summary lands in the cache in one put.
        self.cache
            .put(fingerprint, self.config.mode, Arc::clone(&summary));

        info!(
            document = %doc.name,
            status = summary.status().as_str(),
            chunks = summary.stats.total_chunks,
            omitted = summary.stats.omitted_chunks,
            calls = summary.stats.completion_calls,
            duration_ms = summary.stats.total_duration_ms,
            "summarization complete"
        );
        Ok(summary)
    }

    /// Summarize a batch of documents concurrently.
    ///
    /// Results are returned in input order. Each document succeeds or fails
    /// independently; a cancellation marks every not-yet-started document
    /// as [`SummarizeError::Cancelled`].
    pub async fn summarize_batch(
        &self,
        docs: Vec<Document>,
        cancel: Option<&CancelToken>,
    ) -> Vec<BatchItem> {
        let total = docs.len();
        info!(documents = total, concurrency = self.config.concurrency, "batch started");

        let mut items: Vec<(usize, BatchItem)> = stream::iter(docs.into_iter().enumerate().map(
            |(i, doc)| async move {
                let name = doc.name.clone();
                if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
                    debug!(document = %name, "skipped: batch cancelled");
                    return (
                        i,
                        BatchItem {
                            result: Err(SummarizeError::Cancelled { name: name.clone() }),
                            name,
                        },
                    );
                }
                let result = self.summarize_document(&doc).await;
                if let Err(ref e) = result {
                    warn!(document = %name, "document failed: {e}");
                }
                (i, BatchItem { name, result })
            },
        ))
        .buffer_unordered(self.config.concurrency)
        .collect()
        .await;

        items.sort_by_key(|(i, _)| *i);
        let items: Vec<BatchItem> = items.into_iter().map(|(_, item)| item).collect();

        let failed = items.iter().filter(|i| i.result.is_err()).count();
        info!(documents = total, failed, "batch complete");
        items
    }
}

/// One-shot convenience: summarize a single file with a fresh cache.
///
/// # Example
/// ```rust,no_run
/// use papersum::{summarize, SummaryConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Provider auto-detected from OPENAI_API_KEY / DEEPSEEK_API_KEY
///     let summary = summarize("paper.pdf", SummaryConfig::default()).await?;
///     println!("{}", summary.text);
///     Ok(())
/// }
/// ```
pub async fn summarize(
    input: impl AsRef<Path>,
    config: SummaryConfig,
) -> Result<Summary, SummarizeError> {
    let summarizer = Summarizer::new(config)?;
    let summary = summarizer.summarize_path(input).await?;
    Ok(Arc::try_unwrap(summary).unwrap_or_else(|arc| (*arc).clone()))
}
