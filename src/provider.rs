//! Completion providers: the [`CompletionProvider`] capability and the two
//! hosted implementations (OpenAI, DeepSeek).
//!
//! The Summarizer is deliberately agnostic to which provider services a
//! request — it sees only `request in → text out → typed error out`. Both
//! hosted providers speak the OpenAI-compatible `/chat/completions` wire
//! format, so they share one HTTP client struct and differ only in base URL,
//! default model and default temperature.
//!
//! Retryability is a property of the error, not the call site:
//! [`ProviderError::is_retryable`] lets the retry loop in
//! [`crate::pipeline::llm`] back off on rate limits and 5xx responses while
//! failing fast on authentication errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// One completion request: prompt in, generated text out.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Optional system message.
    pub system: Option<String>,
    /// User prompt (already includes the chunk text).
    pub prompt: String,
    /// Sampling temperature; None = provider default.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: usize,
}

/// Generated text plus token accounting.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Typed provider failures.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// HTTP 429 — back off and retry.
    #[error("Rate limited{}", .retry_after_secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// HTTP 401/403 — retrying will not help.
    #[error("Authentication failed: {detail}")]
    AuthFailed { detail: String },

    /// The call exceeded the configured timeout.
    #[error("Completion call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Any other non-success API response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Connection-level failure before a response arrived.
    #[error("Network error: {detail}")]
    Network { detail: String },
}

impl ProviderError {
    /// Whether the retry loop should attempt this call again.
    ///
    /// Auth failures and client errors (4xx other than 429) are permanent;
    /// everything else is assumed transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::AuthFailed { .. } => false,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => true,
        }
    }
}

/// Capability consumed by the Summarizer: request in, text out, typed
/// error out.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Issue one completion call.
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;
}

// ── OpenAI-compatible HTTP client ────────────────────────────────────────

/// Per-provider wire defaults, from the hosted services' documentation.
#[derive(Debug, Clone)]
pub struct ProviderDefaults {
    pub name: &'static str,
    pub base_url: &'static str,
    pub model: &'static str,
    pub temperature: f32,
    pub api_key_var: &'static str,
}

/// OpenAI defaults: `gpt-4o-mini` at temperature 0.7.
pub const OPENAI_DEFAULTS: ProviderDefaults = ProviderDefaults {
    name: "openai",
    base_url: "https://api.openai.com/v1",
    model: "gpt-4o-mini",
    temperature: 0.7,
    api_key_var: "OPENAI_API_KEY",
};

/// DeepSeek defaults: `deepseek-chat` at temperature 1.0.
pub const DEEPSEEK_DEFAULTS: ProviderDefaults = ProviderDefaults {
    name: "deepseek",
    base_url: "https://api.deepseek.com/v1",
    model: "deepseek-chat",
    temperature: 1.0,
    api_key_var: "DEEPSEEK_API_KEY",
};

/// A hosted provider speaking the OpenAI-compatible chat-completions format.
///
/// Covers both supported services; construct via [`OpenAiCompatible::openai`]
/// or [`OpenAiCompatible::deepseek`], or [`OpenAiCompatible::custom`] for a
/// self-hosted gateway.
pub struct OpenAiCompatible {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    default_temperature: f32,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiCompatible {
    fn from_defaults(
        defaults: &ProviderDefaults,
        api_key: impl Into<String>,
        model: Option<String>,
        base_url: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            name: defaults.name.to_string(),
            base_url: base_url.unwrap_or_else(|| defaults.base_url.to_string()),
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| defaults.model.to_string()),
            default_temperature: defaults.temperature,
            timeout_secs,
            client: reqwest::Client::new(),
        }
    }

    /// OpenAI provider with optional model / base-URL overrides.
    pub fn openai(
        api_key: impl Into<String>,
        model: Option<String>,
        base_url: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        Self::from_defaults(&OPENAI_DEFAULTS, api_key, model, base_url, timeout_secs)
    }

    /// DeepSeek provider with optional model / base-URL overrides.
    pub fn deepseek(
        api_key: impl Into<String>,
        model: Option<String>,
        base_url: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        Self::from_defaults(&DEEPSEEK_DEFAULTS, api_key, model, base_url, timeout_secs)
    }

    /// Arbitrary OpenAI-compatible endpoint (local gateway, proxy).
    pub fn custom(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            default_temperature: 0.7,
            timeout_secs,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[async_trait]
impl CompletionProvider for OpenAiCompatible {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: request.temperature.unwrap_or(self.default_temperature),
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    ProviderError::Network {
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => ProviderError::RateLimited {
                    retry_after_secs: retry_after,
                },
                401 | 403 => ProviderError::AuthFailed { detail: message },
                code => ProviderError::Api {
                    status: code,
                    message,
                },
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| ProviderError::Api {
            status: status.as_u16(),
            message: format!("malformed completion response: {e}"),
        })?;

        let choice = parsed.choices.into_iter().next().ok_or(ProviderError::Api {
            status: status.as_u16(),
            message: "completion response contained no choices".to_string(),
        })?;

        debug!(
            provider = %self.name,
            prompt_tokens = parsed.usage.prompt_tokens,
            completion_tokens = parsed.usage.completion_tokens,
            "completion call succeeded"
        );

        Ok(CompletionResponse {
            text: choice.message.content,
            prompt_tokens: parsed.usage.prompt_tokens,
            completion_tokens: parsed.usage.completion_tokens,
        })
    }
}

/// Instantiate a named provider, reading its API key from the environment.
pub fn create_provider(
    name: &str,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: u64,
) -> Result<OpenAiCompatible, crate::error::SummarizeError> {
    let defaults = match name {
        "openai" => &OPENAI_DEFAULTS,
        "deepseek" => &DEEPSEEK_DEFAULTS,
        other => {
            return Err(crate::error::SummarizeError::ProviderNotConfigured {
                provider: other.to_string(),
                hint: "Supported providers: openai, deepseek".to_string(),
            })
        }
    };
    let api_key = std::env::var(defaults.api_key_var).ok().filter(|k| !k.is_empty());
    let api_key = api_key.ok_or_else(|| crate::error::SummarizeError::ProviderNotConfigured {
        provider: defaults.name.to_string(),
        hint: format!("Set {} in the environment.", defaults.api_key_var),
    })?;
    Ok(OpenAiCompatible::from_defaults(
        defaults, api_key, model, base_url, timeout_secs,
    ))
}

/// Auto-detect a provider from whichever API key variable is set.
///
/// OpenAI is preferred when both keys are present, matching the original
/// behaviour; users with multiple keys select explicitly via
/// [`crate::SummaryConfig::provider_name`].
pub fn provider_from_env(
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: u64,
) -> Result<OpenAiCompatible, crate::error::SummarizeError> {
    for defaults in [&OPENAI_DEFAULTS, &DEEPSEEK_DEFAULTS] {
        if std::env::var(defaults.api_key_var)
            .map(|k| !k.is_empty())
            .unwrap_or(false)
        {
            return create_provider(defaults.name, model, base_url, timeout_secs);
        }
    }
    Err(crate::error::SummarizeError::ProviderNotConfigured {
        provider: "auto".to_string(),
        hint: "No provider could be auto-detected from the environment.\n\
               Set OPENAI_API_KEY or DEEPSEEK_API_KEY."
            .to_string(),
    })
}
