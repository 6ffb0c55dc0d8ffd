//! CLI binary for papersum.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SummaryConfig`, runs the batch, and writes Markdown exports.

use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use papersum::{
    export, BatchItem, Document, DocumentStatus, SummaryConfig, SummaryMode, Summarizer,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarize one paper to stdout
  papersum paper.pdf

  # Concise summaries for a whole directory of papers
  papersum --mode concise papers/*.pdf -o summaries/

  # DeepSeek backend, summaries written in Chinese
  papersum --provider deepseek --lang "Simplified Chinese" paper.pdf

  # Batch with a zip archive of all summaries
  papersum papers/*.pdf papers/*.docx -o summaries/ --archive summaries.zip

  # Detailed summary with a mind-map outline appended
  papersum --mode detailed --outline thesis.pdf -o out/

  # Structured JSON output (summary text, warnings, statistics)
  papersum --json paper.pdf > summary.json

SUPPORTED PROVIDERS & MODELS:
  Provider     Default model   Endpoint
  ─────────    ─────────────   ────────────────────────────
  openai       gpt-4o-mini     https://api.openai.com/v1
  deepseek     deepseek-chat   https://api.deepseek.com/v1

  Any OpenAI-compatible endpoint works via --api-base.

SUMMARY MODES:
  concise    core points only, ~800 words
  standard   methods, results and discussion, ~1500 words (default)
  detailed   in-depth analysis with technical detail, ~2500 words

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY      OpenAI API key
  DEEPSEEK_API_KEY    DeepSeek API key
  PAPERSUM_PROVIDER   Override provider (openai, deepseek)
  PAPERSUM_MODEL      Override model ID

OCR FALLBACK:
  Scanned PDF pages are re-extracted with `pdftoppm` + `tesseract` when both
  are installed. Without them, sparse pages keep their native text and a
  warning is recorded in the summary — never a failure.

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Summarize:       papersum paper.pdf -o summaries/
"#;

/// Summarize academic PDF and DOCX documents using LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "papersum",
    version,
    about = "Summarize academic PDF and DOCX documents using LLMs",
    long_about = "Batch-summarize academic papers (PDF or DOCX) into structured Markdown \
summaries using hosted LLM completion endpoints. Supports OpenAI, DeepSeek, and any \
OpenAI-compatible endpoint. Documents are chunked, summarized concurrently, merged, and \
optionally bundled into a zip archive with a mind-map outline per paper.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or DOCX files to summarize.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Summary detail: concise (~800 words), standard (~1500), detailed (~2500).
    #[arg(short, long, env = "PAPERSUM_MODE", value_enum, default_value = "standard")]
    mode: ModeArg,

    /// Write one Markdown file per document into this directory.
    #[arg(short, long, env = "PAPERSUM_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Bundle all summaries into a zip archive at this path.
    #[arg(long, env = "PAPERSUM_ARCHIVE")]
    archive: Option<PathBuf>,

    /// Completion provider: openai, deepseek.
    #[arg(
        long,
        env = "PAPERSUM_PROVIDER",
        long_help = "Completion provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai (gpt-4o-mini), deepseek (deepseek-chat)."
    )]
    provider: Option<String>,

    /// Completion model ID (e.g. gpt-4o-mini, deepseek-chat).
    #[arg(long, env = "PAPERSUM_MODEL")]
    model: Option<String>,

    /// Base URL override for OpenAI-compatible endpoints.
    #[arg(long, env = "PAPERSUM_API_BASE")]
    api_base: Option<String>,

    /// Number of documents summarized concurrently.
    #[arg(short, long, env = "PAPERSUM_CONCURRENCY", default_value_t = 5)]
    concurrency: usize,

    /// Concurrent chunk completion calls within one document.
    #[arg(long, env = "PAPERSUM_CHUNK_CONCURRENCY", default_value_t = 4)]
    chunk_concurrency: usize,

    /// Maximum chunk size in characters.
    #[arg(long, env = "PAPERSUM_CHUNK_SIZE", default_value_t = 2000)]
    chunk_size: usize,

    /// Retries per chunk on transient completion failures.
    #[arg(long, env = "PAPERSUM_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Max completion tokens per call.
    #[arg(long, env = "PAPERSUM_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0). Default: provider-specific.
    #[arg(long, env = "PAPERSUM_TEMPERATURE")]
    temperature: Option<f32>,

    /// Per-completion-call timeout in seconds.
    #[arg(long, env = "PAPERSUM_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Disable OCR fallback for scanned PDF pages.
    #[arg(long, env = "PAPERSUM_NO_OCR")]
    no_ocr: bool,

    /// Tesseract language spec for OCR (e.g. "eng", "eng+deu").
    #[arg(long, env = "PAPERSUM_OCR_LANG", default_value = "eng+chi_sim+chi_tra")]
    ocr_lang: String,

    /// Append a mind-map outline to each summary.
    #[arg(long, env = "PAPERSUM_OUTLINE")]
    outline: bool,

    /// Language the summaries should be written in (e.g. "Simplified Chinese").
    #[arg(long, env = "PAPERSUM_LANG")]
    lang: Option<String>,

    /// Output structured JSON instead of Markdown.
    #[arg(long, env = "PAPERSUM_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PAPERSUM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPERSUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PAPERSUM_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Concise,
    Standard,
    Detailed,
}

impl From<ModeArg> for SummaryMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Concise => SummaryMode::Concise,
            ModeArg::Standard => SummaryMode::Standard,
            ModeArg::Detailed => SummaryMode::Detailed,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config & summarizer ────────────────────────────────────────
    let config = build_config(&cli)?;
    let summarizer = Arc::new(Summarizer::new(config).context("Provider setup failed")?);

    // ── Load documents ───────────────────────────────────────────────────
    // A missing or unreadable file becomes a failed item, not an abort:
    // the rest of the batch still runs.
    let mut failed_loads: Vec<BatchItem> = Vec::new();
    let mut docs: Vec<Document> = Vec::new();
    for input in &cli.inputs {
        match Document::from_path(input).await {
            Ok(doc) => docs.push(doc),
            Err(e) => failed_loads.push(BatchItem {
                name: input.display().to_string(),
                result: Err(e),
            }),
        }
    }

    // ── Run batch with progress ──────────────────────────────────────────
    let bar = if show_progress {
        let bar = ProgressBar::new(docs.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} documents  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Summarizing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let concurrency = cli.concurrency.max(1);
    let mut items: Vec<(usize, BatchItem)> = stream::iter(docs.into_iter().enumerate().map(
        |(i, doc)| {
            let summarizer = Arc::clone(&summarizer);
            let bar = bar.clone();
            async move {
                let name = doc.name.clone();
                if let Some(ref bar) = bar {
                    bar.set_message(name.clone());
                }
                let result = summarizer.summarize_document(&doc).await;
                if let Some(ref bar) = bar {
                    bar.inc(1);
                }
                (i, BatchItem { name, result })
            }
        },
    ))
    .buffer_unordered(concurrency)
    .collect()
    .await;
    items.sort_by_key(|(i, _)| *i);
    let mut items: Vec<BatchItem> = items.into_iter().map(|(_, item)| item).collect();
    items.extend(failed_loads);

    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    // ── Report & export ──────────────────────────────────────────────────
    report(&cli, &items).await?;

    let failed = items.iter().filter(|i| i.result.is_err()).count();
    if failed == items.len() {
        anyhow::bail!("All {} documents failed", failed);
    }
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `SummaryConfig`.
fn build_config(cli: &Cli) -> Result<SummaryConfig> {
    let mut builder = SummaryConfig::builder()
        .mode(cli.mode.into())
        .chunk_size(cli.chunk_size)
        .concurrency(cli.concurrency)
        .chunk_concurrency(cli.chunk_concurrency)
        .max_retries(cli.max_retries)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .ocr_enabled(!cli.no_ocr)
        .ocr_language(&cli.ocr_lang)
        .outline(cli.outline);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref base) = cli.api_base {
        builder = builder.api_base(base);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(ref lang) = cli.lang {
        builder = builder.output_language(lang);
    }

    builder.build().context("Invalid configuration")
}

/// Print per-document results and write exports.
async fn report(cli: &Cli, items: &[BatchItem]) -> Result<()> {
    // Single document, no output destination: the summary goes to stdout.
    let to_stdout = cli.out_dir.is_none() && cli.archive.is_none() && items.len() == 1;

    if cli.json {
        let payload: Vec<serde_json::Value> = items
            .iter()
            .map(|item| match &item.result {
                Ok(summary) => serde_json::json!({
                    "name": item.name,
                    "status": item.status().as_str(),
                    "summary": summary.as_ref(),
                }),
                Err(e) => serde_json::json!({
                    "name": item.name,
                    "status": "failed",
                    "error": e.to_string(),
                }),
            })
            .collect();
        let out = if items.len() == 1 {
            serde_json::to_string_pretty(&payload[0])
        } else {
            serde_json::to_string_pretty(&payload)
        };
        println!("{}", out.context("Failed to serialize output")?);
    } else if to_stdout {
        match &items[0].result {
            Ok(summary) => {
                let markdown = export::render_markdown(summary);
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(markdown.as_bytes())
                    .context("Failed to write to stdout")?;
            }
            Err(e) => anyhow::bail!("{e}"),
        }
    }

    // Per-document status lines on stderr.
    if !cli.quiet && !to_stdout {
        for item in items {
            match &item.result {
                Ok(summary) => {
                    let tick = match summary.status() {
                        DocumentStatus::Succeeded => green("✔"),
                        _ => yellow("⚠"),
                    };
                    eprintln!(
                        "{tick}  {}  {}",
                        bold(&item.name),
                        dim(&format!(
                            "{} pages, {} chunks, {}ms",
                            summary.stats.total_pages,
                            summary.stats.total_chunks,
                            summary.stats.total_duration_ms
                        )),
                    );
                    for warning in &summary.warnings {
                        eprintln!("   {}", yellow(&warning.to_string()));
                    }
                }
                Err(e) => eprintln!("{}  {}  {}", red("✖"), bold(&item.name), e),
            }
        }
    }

    // File exports happen after the batch; they are quick relative to the
    // completion calls.
    let summaries: Vec<_> = items
        .iter()
        .filter_map(|i| i.result.as_ref().ok())
        .map(|arc| arc.as_ref().clone())
        .collect();

    if let Some(ref out_dir) = cli.out_dir {
        for summary in &summaries {
            let path = out_dir.join(format!("{}.md", file_stem(&summary.source_name)));
            export::write_summary(summary, &path)
                .await
                .with_context(|| format!("Failed to export {}", path.display()))?;
        }
        if !cli.quiet {
            eprintln!(
                "{}  {} summaries → {}",
                green("✔"),
                summaries.len(),
                bold(&out_dir.display().to_string())
            );
        }
    }

    if let Some(ref archive) = cli.archive {
        export::write_archive(&summaries, archive)
            .await
            .with_context(|| format!("Failed to write archive {}", archive.display()))?;
        if !cli.quiet {
            eprintln!("{}  archive → {}", green("✔"), bold(&archive.display().to_string()));
        }
    }

    Ok(())
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("summary")
        .to_string()
}
