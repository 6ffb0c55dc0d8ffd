//! Configuration types for document summarization.
//!
//! All pipeline behaviour is controlled through [`SummaryConfig`], built via
//! its [`SummaryConfigBuilder`] and passed explicitly into
//! [`crate::Summarizer`] or the one-shot [`crate::summarize()`]. There is no
//! ambient process-wide state: keeping every knob in one struct makes it
//! trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.

use crate::error::SummarizeError;
use crate::prompts::PromptSet;
use crate::provider::CompletionProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Summary detail tier. The mode uniquely determines the default target
/// word budget of the final summary (see [`ModeBudgets`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SummaryMode {
    /// Core points only, ~800 words.
    Concise,
    /// Methods, results and discussion, ~1500 words. (default)
    #[default]
    Standard,
    /// In-depth analysis with technical detail, ~2500 words.
    Detailed,
}

impl SummaryMode {
    /// Default final-summary word budget for this mode.
    pub fn default_word_budget(&self) -> usize {
        match self {
            SummaryMode::Concise => 800,
            SummaryMode::Standard => 1500,
            SummaryMode::Detailed => 2500,
        }
    }

    /// Stable lowercase name, used in cache keys, logs and export headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::Concise => "concise",
            SummaryMode::Standard => "standard",
            SummaryMode::Detailed => "detailed",
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryMode {
    type Err = SummarizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "concise" => Ok(SummaryMode::Concise),
            "standard" => Ok(SummaryMode::Standard),
            "detailed" => Ok(SummaryMode::Detailed),
            other => Err(SummarizeError::InvalidConfig(format!(
                "Unknown mode '{other}': expected concise, standard or detailed"
            ))),
        }
    }
}

/// Per-mode word-budget overrides for the final summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModeBudgets {
    pub concise: usize,
    pub standard: usize,
    pub detailed: usize,
}

impl Default for ModeBudgets {
    fn default() -> Self {
        Self {
            concise: SummaryMode::Concise.default_word_budget(),
            standard: SummaryMode::Standard.default_word_budget(),
            detailed: SummaryMode::Detailed.default_word_budget(),
        }
    }
}

impl ModeBudgets {
    /// Target word budget for the given mode.
    pub fn budget_for(&self, mode: SummaryMode) -> usize {
        match mode {
            SummaryMode::Concise => self.concise,
            SummaryMode::Standard => self.standard,
            SummaryMode::Detailed => self.detailed,
        }
    }
}

/// Configuration for a summarization run.
///
/// Built via [`SummaryConfig::builder()`] or [`SummaryConfig::default()`].
///
/// # Example
/// ```rust
/// use papersum::{SummaryConfig, SummaryMode};
///
/// let config = SummaryConfig::builder()
///     .mode(SummaryMode::Concise)
///     .concurrency(2)
///     .model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SummaryConfig {
    /// Summary detail tier. Default: [`SummaryMode::Standard`].
    pub mode: SummaryMode,

    /// Final-summary word budgets per mode. Defaults: 800 / 1500 / 2500.
    pub word_budgets: ModeBudgets,

    /// Maximum chunk size in characters. Default: 2000.
    ///
    /// Small enough that a mode prompt plus one chunk stays comfortably
    /// inside any hosted model's context window; large enough that a typical
    /// paper needs only a handful of chunk calls.
    pub chunk_size: usize,

    /// Number of documents summarized concurrently in a batch. Default: 5.
    ///
    /// Each document pipeline is independent; this is the admission-control
    /// bound against provider rate limits.
    pub concurrency: usize,

    /// Number of concurrent chunk completion calls within one document.
    /// Default: 4.
    pub chunk_concurrency: usize,

    /// Maximum retry attempts on a transient completion failure. Default: 3.
    ///
    /// Rate-limit and 5xx errors are usually transient under concurrent
    /// load. Permanent errors (bad API key) are not retried — they exhaust
    /// the chunk immediately.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Completion model identifier, e.g. "gpt-4o-mini", "deepseek-chat".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// Provider name ("openai", "deepseek"). If None along with `provider`,
    /// the provider is auto-detected from environment API keys.
    pub provider_name: Option<String>,

    /// Base URL override for the completion endpoint (self-hosted gateways).
    pub api_base: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn CompletionProvider>>,

    /// Sampling temperature. If None, uses the provider default
    /// (0.7 for OpenAI, 1.0 for DeepSeek).
    pub temperature: Option<f32>,

    /// Maximum tokens per completion call. Default: 4096.
    pub max_tokens: usize,

    /// Per-completion-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Re-extract low-density PDF pages via OCR. Default: true.
    ///
    /// OCR is best-effort: missing `tesseract`/`pdftoppm` binaries downgrade
    /// to native-only extraction with a recorded warning, never a failure.
    pub ocr_enabled: bool,

    /// A PDF page whose native extraction yields fewer characters than this
    /// is considered scanned and re-extracted via OCR. Default: 32.
    pub min_native_chars: usize,

    /// Tesseract language spec for OCR re-extraction.
    /// Default: "eng+chi_sim+chi_tra" (English plus simplified and
    /// traditional Chinese, matching academic papers with CJK content).
    pub ocr_language: String,

    /// Maximum document size in bytes. Default: 50 MB.
    pub max_file_bytes: u64,

    /// Maximum document page count. Default: 100.
    pub max_pages: usize,

    /// Cache capacity in entries; None = unbounded. Default: None.
    pub cache_capacity: Option<usize>,

    /// Build a mind-map outline from the final summary. Default: false.
    pub outline: bool,

    /// Maximum character length of an outline node label before truncation.
    /// Default: 60.
    pub outline_max_label: usize,

    /// Language the summary should be written in, appended to every prompt
    /// (e.g. "Simplified Chinese"). None = same language as the model picks.
    pub output_language: Option<String>,

    /// Prompt templates. Override to change mode prompts, the merge prompt,
    /// or the partial-summary framing without touching pipeline code.
    pub prompts: PromptSet,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            mode: SummaryMode::default(),
            word_budgets: ModeBudgets::default(),
            chunk_size: 2000,
            concurrency: 5,
            chunk_concurrency: 4,
            max_retries: 3,
            retry_backoff_ms: 500,
            model: None,
            provider_name: None,
            api_base: None,
            provider: None,
            temperature: None,
            max_tokens: 4096,
            api_timeout_secs: 60,
            ocr_enabled: true,
            min_native_chars: 32,
            ocr_language: "eng+chi_sim+chi_tra".to_string(),
            max_file_bytes: 50 * 1024 * 1024,
            max_pages: 100,
            cache_capacity: None,
            outline: false,
            outline_max_label: 60,
            output_language: None,
            prompts: PromptSet::default(),
        }
    }
}

impl fmt::Debug for SummaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryConfig")
            .field("mode", &self.mode)
            .field("word_budgets", &self.word_budgets)
            .field("chunk_size", &self.chunk_size)
            .field("concurrency", &self.concurrency)
            .field("chunk_concurrency", &self.chunk_concurrency)
            .field("max_retries", &self.max_retries)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field(
                "provider",
                &self.provider.as_ref().map(|_| "<dyn CompletionProvider>"),
            )
            .field("ocr_enabled", &self.ocr_enabled)
            .field("cache_capacity", &self.cache_capacity)
            .field("outline", &self.outline)
            .finish()
    }
}

impl SummaryConfig {
    /// Create a new builder for `SummaryConfig`.
    pub fn builder() -> SummaryConfigBuilder {
        SummaryConfigBuilder {
            config: Self::default(),
        }
    }

    /// Final-summary word budget for the configured mode.
    pub fn word_budget(&self) -> usize {
        self.word_budgets.budget_for(self.mode)
    }
}

/// Builder for [`SummaryConfig`].
#[derive(Debug)]
pub struct SummaryConfigBuilder {
    config: SummaryConfig,
}

impl SummaryConfigBuilder {
    pub fn mode(mut self, mode: SummaryMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn word_budgets(mut self, budgets: ModeBudgets) -> Self {
        self.config.word_budgets = budgets;
        self
    }

    pub fn chunk_size(mut self, chars: usize) -> Self {
        self.config.chunk_size = chars.max(200);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn chunk_concurrency(mut self, n: usize) -> Self {
        self.config.chunk_concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.config.api_base = Some(url.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr_enabled = v;
        self
    }

    pub fn min_native_chars(mut self, n: usize) -> Self {
        self.config.min_native_chars = n;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    pub fn cache_capacity(mut self, entries: usize) -> Self {
        self.config.cache_capacity = Some(entries);
        self
    }

    pub fn outline(mut self, v: bool) -> Self {
        self.config.outline = v;
        self
    }

    pub fn outline_max_label(mut self, chars: usize) -> Self {
        self.config.outline_max_label = chars.max(8);
        self
    }

    pub fn output_language(mut self, lang: impl Into<String>) -> Self {
        self.config.output_language = Some(lang.into());
        self
    }

    pub fn prompts(mut self, prompts: PromptSet) -> Self {
        self.config.prompts = prompts;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummaryConfig, SummarizeError> {
        let c = &self.config;
        if c.chunk_size < 200 {
            return Err(SummarizeError::InvalidConfig(format!(
                "chunk_size must be ≥ 200 characters, got {}",
                c.chunk_size
            )));
        }
        if c.concurrency == 0 || c.chunk_concurrency == 0 {
            return Err(SummarizeError::InvalidConfig(
                "concurrency limits must be ≥ 1".into(),
            ));
        }
        if c.max_pages == 0 {
            return Err(SummarizeError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
