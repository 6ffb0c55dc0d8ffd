//! End-to-end pipeline tests over in-memory DOCX fixtures.
//!
//! No live API calls: a scripted [`CompletionProvider`] stands in for the
//! completion endpoint, so these tests check the orchestration — chunk
//! fan-out, retry, degradation, caching, concurrency bounds, batch ordering
//! and cancellation — with deterministic outcomes.

use async_trait::async_trait;
use papersum::{
    CancelToken, CompletionProvider, CompletionRequest, CompletionResponse, Document,
    DocumentStatus, PipelineWarning, ProviderError, SummarizeError, Summarizer, SummaryConfig,
};
use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Markers the scripted provider recognises inside chunk prompts.
const MARKERS: &[&str] = &["ALPHA", "BRAVO", "CHARLIE", "DELTA", "ECHO"];

/// Build a minimal DOCX (zip with `word/document.xml`) from paragraphs.
fn docx_bytes(paragraphs: &[String]) -> Vec<u8> {
    let mut body = String::from("<w:document><w:body>");
    for text in paragraphs {
        body.push_str(&format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"));
    }
    body.push_str("</w:body></w:document>");

    let cursor = std::io::Cursor::new(Vec::new());
    let mut zip = zip::ZipWriter::new(cursor);
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(body.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// A paragraph long enough that two of them never share one 200-char chunk,
/// carrying a unique marker the scripted provider keys on.
fn marker_paragraph(marker: &str) -> String {
    format!(
        "{marker} section. {}",
        "This paragraph describes the study in enough detail to fill out one chunk of text. "
            .repeat(2)
    )
}

/// A three-chunk document with markers ALPHA, BRAVO, CHARLIE.
fn three_chunk_doc() -> Document {
    let paragraphs: Vec<String> = ["ALPHA", "BRAVO", "CHARLIE"]
        .iter()
        .map(|m| marker_paragraph(m))
        .collect();
    Document::from_bytes("paper.docx", docx_bytes(&paragraphs)).unwrap()
}

fn single_chunk_doc(marker: &str) -> Document {
    let name = format!("{}.docx", marker.to_lowercase());
    Document::from_bytes(name, docx_bytes(&[marker_paragraph(marker)])).unwrap()
}

/// Assemble a minimal valid two-page PDF, one line of Helvetica text per
/// page. Cross-reference offsets are computed from the actual byte
/// positions, so the file parses without repair.
fn two_page_pdf() -> Vec<u8> {
    let content_stream = |text: &str| {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        )
    };
    let page = |contents: &str| {
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 7 0 R >> >> /Contents {contents} >>"
        )
    };
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>".to_string(),
        page("5 0 R"),
        page("6 0 R"),
        content_stream("First page of the study."),
        content_stream("Second page of the study."),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut buf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(buf.len());
        buf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref_at = buf.len();
    buf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        buf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    buf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    buf
}

// ── Scripted provider ────────────────────────────────────────────────────────

/// Deterministic provider: echoes chunk markers back as partials, merges by
/// concatenating the markers it sees, and fails scripted markers a set
/// number of times. Tracks call counts and peak in-flight concurrency.
struct ScriptedProvider {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// marker → remaining failures before that chunk's calls succeed.
    fail_remaining: Mutex<HashMap<String, usize>>,
    delay: Duration,
}

impl ScriptedProvider {
    fn new() -> Arc<Self> {
        Self::with_delay(0)
    }

    fn with_delay(ms: u64) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail_remaining: Mutex::new(HashMap::new()),
            delay: Duration::from_millis(ms),
        })
    }

    fn fail_marker(&self, marker: &str, times: usize) {
        self.fail_remaining
            .lock()
            .unwrap()
            .insert(marker.to_string(), times);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let ok = |text: String| {
            Ok(CompletionResponse {
                text,
                prompt_tokens: 10,
                completion_tokens: 5,
            })
        };

        // Merge call: concatenate the markers present in the partials.
        if request.prompt.contains("--- Part 1 ---") {
            let merged: Vec<&str> = MARKERS
                .iter()
                .copied()
                .filter(|m| request.prompt.contains(m))
                .collect();
            return ok(format!("## Overview\n\nmerged:{}", merged.join("+")));
        }

        // Chunk call: key on the marker inside the chunk text.
        let marker = MARKERS
            .iter()
            .copied()
            .find(|m| request.prompt.contains(m))
            .unwrap_or("UNKNOWN");
        {
            let mut failures = self.fail_remaining.lock().unwrap();
            if let Some(remaining) = failures.get_mut(marker) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ProviderError::RateLimited {
                        retry_after_secs: None,
                    });
                }
            }
        }
        ok(format!("summary of {marker}"))
    }
}

fn config_with(provider: Arc<ScriptedProvider>) -> SummaryConfig {
    SummaryConfig::builder()
        .provider(provider as Arc<dyn CompletionProvider>)
        .chunk_size(200)
        .retry_backoff_ms(1)
        .max_retries(3)
        .build()
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn multi_chunk_document_fans_out_and_merges() {
    let provider = ScriptedProvider::new();
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();

    let summary = summarizer
        .summarize_document(&three_chunk_doc())
        .await
        .unwrap();

    assert_eq!(summary.stats.total_chunks, 3);
    // 3 chunk calls + 1 merge call.
    assert_eq!(provider.calls(), 4);
    assert_eq!(summary.stats.completion_calls, 4);
    // The merge saw every partial, in document order.
    assert_eq!(summary.text, "## Overview\n\nmerged:ALPHA+BRAVO+CHARLIE");
    assert!(!summary.degraded);
    assert_eq!(summary.status(), DocumentStatus::Succeeded);
    assert_eq!(summary.stats.prompt_tokens, 40);
    assert_eq!(summary.stats.completion_tokens, 20);
}

#[tokio::test]
async fn transient_chunk_failures_recover_without_degradation() {
    let provider = ScriptedProvider::new();
    provider.fail_marker("BRAVO", 2);
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();

    let summary = summarizer
        .summarize_document(&three_chunk_doc())
        .await
        .unwrap();

    assert!(!summary.degraded);
    assert!(summary.warnings.is_empty());
    assert_eq!(summary.text, "## Overview\n\nmerged:ALPHA+BRAVO+CHARLIE");
    // 3 chunks + 2 retries + 1 merge.
    assert_eq!(summary.stats.completion_calls, 6);
}

#[tokio::test]
async fn exhausted_chunk_degrades_summary_but_keeps_the_rest() {
    let provider = ScriptedProvider::new();
    provider.fail_marker("BRAVO", usize::MAX);
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();

    let summary = summarizer
        .summarize_document(&three_chunk_doc())
        .await
        .unwrap();

    assert!(summary.degraded);
    assert_eq!(summary.stats.omitted_chunks, 1);
    assert_eq!(summary.status(), DocumentStatus::SucceededWithWarnings);
    // The merge still ran over the surviving chunks, in order.
    assert_eq!(summary.text, "## Overview\n\nmerged:ALPHA+CHARLIE");
    assert!(summary.warnings.iter().any(|w| matches!(
        w,
        PipelineWarning::ChunkOmitted { index: 1, retries: 3, .. }
    )));
}

#[tokio::test]
async fn all_chunks_lost_is_a_document_failure() {
    let provider = ScriptedProvider::new();
    for marker in ["ALPHA", "BRAVO", "CHARLIE"] {
        provider.fail_marker(marker, usize::MAX);
    }
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();

    let err = summarizer
        .summarize_document(&three_chunk_doc())
        .await
        .unwrap_err();
    assert!(matches!(err, SummarizeError::SummarizationFailed { .. }));
}

#[tokio::test]
async fn single_chunk_document_skips_the_merge_call() {
    let provider = ScriptedProvider::new();
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();

    let summary = summarizer
        .summarize_document(&single_chunk_doc("ALPHA"))
        .await
        .unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(summary.text, "summary of ALPHA");
}

#[tokio::test]
async fn cache_hit_issues_no_further_calls() {
    let provider = ScriptedProvider::new();
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();
    let doc = three_chunk_doc();

    let first = summarizer.summarize_document(&doc).await.unwrap();
    let calls_after_first = provider.calls();
    assert!(!first.stats.cache_hit);

    let second = summarizer.summarize_document(&doc).await.unwrap();
    assert_eq!(provider.calls(), calls_after_first);
    assert!(second.stats.cache_hit);
    assert_eq!(second.text, first.text);

    // Same content under a different name still hits.
    let renamed = Document::from_bytes("copy.docx", doc.bytes.clone()).unwrap();
    let third = summarizer.summarize_document(&renamed).await.unwrap();
    assert_eq!(provider.calls(), calls_after_first);
    assert!(third.stats.cache_hit);
}

#[tokio::test]
async fn oversize_document_rejected_before_any_call() {
    let provider = ScriptedProvider::new();
    let mut config = config_with(Arc::clone(&provider));
    config.max_file_bytes = 64;
    let summarizer = Summarizer::new(config).unwrap();

    let err = summarizer
        .summarize_document(&three_chunk_doc())
        .await
        .unwrap_err();
    assert!(matches!(err, SummarizeError::SizeLimitExceeded { .. }));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn over_page_limit_document_rejected_before_any_call() {
    let provider = ScriptedProvider::new();
    let mut config = config_with(Arc::clone(&provider));
    config.max_pages = 1;
    let summarizer = Summarizer::new(config).unwrap();

    let doc = Document::from_bytes("long.pdf", two_page_pdf()).unwrap();
    let err = summarizer.summarize_document(&doc).await.unwrap_err();
    assert!(matches!(err, SummarizeError::PageLimitExceeded { .. }), "got: {err}");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn empty_document_rejected_before_any_call() {
    let provider = ScriptedProvider::new();
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();

    let doc = Document::from_bytes("empty.docx", docx_bytes(&[])).unwrap();
    let err = summarizer.summarize_document(&doc).await.unwrap_err();
    assert!(matches!(err, SummarizeError::EmptyDocument { .. }));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batch_concurrency_stays_within_bound() {
    let provider = ScriptedProvider::with_delay(30);
    let mut config = config_with(Arc::clone(&provider));
    config.concurrency = 2;
    config.chunk_concurrency = 1;
    let summarizer = Summarizer::new(config).unwrap();

    // Five single-chunk documents: one completion call each, no merge.
    let docs: Vec<Document> = MARKERS.iter().map(|m| single_chunk_doc(m)).collect();
    let items = summarizer.summarize_batch(docs, None).await;

    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|i| i.result.is_ok()));
    assert_eq!(provider.calls(), 5);
    assert!(
        provider.max_in_flight() <= 2,
        "peak in-flight calls was {}",
        provider.max_in_flight()
    );
}

#[tokio::test]
async fn batch_preserves_input_order_and_isolates_failures() {
    let provider = ScriptedProvider::new();
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();

    // Valid zip magic, invalid archive: fails at extraction, not detection.
    let mut corrupt = b"PK\x03\x04".to_vec();
    corrupt.extend_from_slice(b"garbage that is not a zip central directory");
    let docs = vec![
        single_chunk_doc("ALPHA"),
        Document::from_bytes("broken.docx", corrupt).unwrap(),
        single_chunk_doc("CHARLIE"),
    ];

    let items = summarizer.summarize_batch(docs, None).await;
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].name, "alpha.docx");
    assert_eq!(items[1].name, "broken.docx");
    assert_eq!(items[2].name, "charlie.docx");
    assert!(items[0].result.is_ok());
    assert!(matches!(
        items[1].result,
        Err(SummarizeError::CorruptFile { .. })
    ));
    assert!(items[2].result.is_ok());
    assert_eq!(items[1].status(), DocumentStatus::Failed);
}

#[tokio::test]
async fn cancelled_batch_skips_pending_documents() {
    let provider = ScriptedProvider::new();
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();

    let token = CancelToken::new();
    token.cancel();
    let docs = vec![single_chunk_doc("ALPHA"), single_chunk_doc("BRAVO")];
    let items = summarizer.summarize_batch(docs, Some(&token)).await;

    assert_eq!(provider.calls(), 0);
    assert!(items
        .iter()
        .all(|i| matches!(i.result, Err(SummarizeError::Cancelled { .. }))));
}

#[tokio::test]
async fn outline_is_derived_from_the_merged_summary() {
    let provider = ScriptedProvider::new();
    let mut config = config_with(Arc::clone(&provider));
    config.outline = true;
    let summarizer = Summarizer::new(config).unwrap();

    let summary = summarizer
        .summarize_document(&three_chunk_doc())
        .await
        .unwrap();

    let outline = summary.outline.as_ref().expect("outline requested");
    assert_eq!(outline.root, "paper.docx");
    assert_eq!(outline.nodes[0].label, "Overview");
}

#[tokio::test]
async fn degraded_summaries_are_cached_too() {
    let provider = ScriptedProvider::new();
    provider.fail_marker("BRAVO", usize::MAX);
    let summarizer = Summarizer::new(config_with(Arc::clone(&provider))).unwrap();
    let doc = three_chunk_doc();

    let first = summarizer.summarize_document(&doc).await.unwrap();
    assert!(first.degraded);
    let calls_after_first = provider.calls();

    // Re-running an unchanged document does not retry the lost chunk.
    let second = summarizer.summarize_document(&doc).await.unwrap();
    assert_eq!(provider.calls(), calls_after_first);
    assert!(second.degraded);
    assert!(second.stats.cache_hit);
}
