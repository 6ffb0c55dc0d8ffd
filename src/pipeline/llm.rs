//! Completion-call driving: per-chunk partial summaries and the final merge,
//! with retry and exponential backoff.
//!
//! This module is intentionally thin — all prompt text lives in
//! [`crate::prompts`] so it can be changed without touching retry or
//! error-handling logic here.
//!
//! ## Retry strategy
//!
//! Rate-limit (429) and 5xx errors are transient and frequent under
//! concurrent load. Exponential backoff (`retry_backoff_ms * 2^attempt`)
//! avoids thundering-herd: with 500 ms base and 3 retries the wait sequence
//! is 500 ms → 1 s → 2 s. A server-supplied `Retry-After` extends the wait
//! when it is longer than the computed backoff. Non-retryable errors (auth,
//! 4xx) stop the loop immediately — retrying a bad API key helps nobody.
//!
//! A chunk that exhausts its retries is returned as an *omitted*
//! [`ChunkOutcome`], never an `Err`: one bad chunk degrades the summary
//! instead of aborting the document.

use crate::config::SummaryConfig;
use crate::document::Chunk;
use crate::provider::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderError};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Result of summarizing one chunk. `partial == None` means the chunk's
/// contribution was omitted after retry exhaustion.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub index: usize,
    pub partial: Option<String>,
    pub retries: u32,
    pub calls: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub error: Option<String>,
}

/// Summarize one chunk with a word target proportional to its share of the
/// document.
///
/// Partial summaries are asked to be ~1.5× the chunk's proportional slice of
/// the final budget so the merge step condenses rather than pads.
pub async fn summarize_chunk(
    provider: &Arc<dyn CompletionProvider>,
    chunk: &Chunk,
    total_chars: usize,
    config: &SummaryConfig,
) -> ChunkOutcome {
    let share = chunk.text.chars().count() as f64 / total_chars.max(1) as f64;
    let target_words = ((config.word_budget() as f64 * share * 1.5) as usize).max(100);

    let request = CompletionRequest {
        system: Some(config.prompts.system.clone()),
        prompt: config.prompts.chunk_prompt(
            config.mode,
            &chunk.text,
            target_words,
            config.output_language.as_deref(),
        ),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    match complete_with_retry(provider, &request, config, &format!("chunk {}", chunk.index)).await
    {
        Ok(attempt) => ChunkOutcome {
            index: chunk.index,
            partial: Some(attempt.response.text),
            retries: attempt.retries,
            calls: attempt.calls,
            prompt_tokens: attempt.response.prompt_tokens,
            completion_tokens: attempt.response.completion_tokens,
            error: None,
        },
        Err(attempt) => ChunkOutcome {
            index: chunk.index,
            partial: None,
            retries: attempt.retries,
            calls: attempt.calls,
            prompt_tokens: 0,
            completion_tokens: 0,
            error: Some(attempt.error.to_string()),
        },
    }
}

/// Merge partial summaries into the final text with one completion call.
pub async fn merge_partials(
    provider: &Arc<dyn CompletionProvider>,
    partials: &[String],
    config: &SummaryConfig,
) -> Result<CompletedAttempt, FailedAttempt> {
    let request = CompletionRequest {
        system: Some(config.prompts.system.clone()),
        prompt: config.prompts.merge_prompt(
            partials,
            config.word_budget(),
            config.output_language.as_deref(),
        ),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    complete_with_retry(provider, &request, config, "merge").await
}

/// A successful call plus how much effort it took.
#[derive(Debug)]
pub struct CompletedAttempt {
    pub response: CompletionResponse,
    pub retries: u32,
    pub calls: usize,
}

/// A call that ran out of retries (or hit a permanent error).
#[derive(Debug)]
pub struct FailedAttempt {
    pub error: ProviderError,
    pub retries: u32,
    pub calls: usize,
}

/// Issue a completion call, retrying transient failures with exponential
/// backoff up to `config.max_retries`.
pub async fn complete_with_retry(
    provider: &Arc<dyn CompletionProvider>,
    request: &CompletionRequest,
    config: &SummaryConfig,
    what: &str,
) -> Result<CompletedAttempt, FailedAttempt> {
    let mut calls = 0usize;
    let mut last_err: Option<ProviderError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            // Cap the exponent: large retry budgets must not overflow the
            // doubling, they just stop growing the wait.
            let mut backoff = config
                .retry_backoff_ms
                .saturating_mul(2u64.saturating_pow((attempt - 1).min(20)));
            if let Some(ProviderError::RateLimited {
                retry_after_secs: Some(secs),
            }) = &last_err
            {
                backoff = backoff.max(secs * 1000);
            }
            warn!(
                "{}: retry {}/{} after {}ms",
                what, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        calls += 1;
        match provider.complete(request).await {
            Ok(response) => {
                debug!(
                    "{}: {} prompt tokens, {} completion tokens, attempt {}",
                    what,
                    response.prompt_tokens,
                    response.completion_tokens,
                    attempt + 1
                );
                return Ok(CompletedAttempt {
                    response,
                    retries: attempt,
                    calls,
                });
            }
            Err(e) => {
                warn!("{}: attempt {} failed — {}", what, attempt + 1, e);
                let permanent = !e.is_retryable();
                last_err = Some(e);
                if permanent {
                    break;
                }
            }
        }
    }

    let error = last_err.unwrap_or(ProviderError::Network {
        detail: "no attempts were made".to_string(),
    });
    Err(FailedAttempt {
        error,
        retries: config.max_retries,
        calls,
    })
}
