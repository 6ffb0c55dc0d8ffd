//! Extraction: validate input limits and pull page-tagged text from PDF and
//! DOCX documents, re-extracting sparse PDF pages via OCR.
//!
//! ## Why validate here?
//!
//! Size and page limits are enforced before any completion call can be
//! issued, so a rejected document costs no API spend. Size is checked on the
//! raw bytes; the page limit is checked right after parsing, before any OCR
//! work starts.
//!
//! Native PDF parsing is CPU-bound, so it runs under `spawn_blocking` to
//! keep the async executor responsive while large documents parse.

use crate::config::SummaryConfig;
use crate::document::{Document, DocumentFormat, ExtractedText, ExtractionMethod, PageText};
use crate::error::{PipelineWarning, SummarizeError};
use crate::pipeline::ocr;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use tracing::{debug, info, warn};

/// Extraction result: page-tagged text plus any degradation warnings.
#[derive(Debug)]
pub struct Extraction {
    pub text: ExtractedText,
    pub warnings: Vec<PipelineWarning>,
}

/// Extract text from a validated document.
///
/// # Errors
/// `SizeLimitExceeded`, `PageLimitExceeded`, `CorruptFile`, `EmptyDocument`.
pub async fn extract(doc: &Document, config: &SummaryConfig) -> Result<Extraction, SummarizeError> {
    let size = doc.bytes.len() as u64;
    if size > config.max_file_bytes {
        return Err(SummarizeError::SizeLimitExceeded {
            name: doc.name.clone(),
            size,
            limit: config.max_file_bytes,
        });
    }

    let mut extraction = match doc.format {
        DocumentFormat::Pdf => extract_pdf(doc, config).await?,
        DocumentFormat::Docx => extract_docx(doc).await?,
    };

    for page in &mut extraction.text.pages {
        page.text = clean_text(&page.text);
    }

    if extraction.text.is_empty() {
        return Err(SummarizeError::EmptyDocument {
            name: doc.name.clone(),
        });
    }

    info!(
        document = %doc.name,
        pages = extraction.text.pages.len(),
        ocr_pages = extraction.text.ocr_pages(),
        chars = extraction.text.char_count(),
        "extraction complete"
    );
    Ok(extraction)
}

// ── PDF ──────────────────────────────────────────────────────────────────

async fn extract_pdf(doc: &Document, config: &SummaryConfig) -> Result<Extraction, SummarizeError> {
    let bytes = doc.bytes.clone();
    let name = doc.name.clone();

    // pdf-extract separates pages with form feeds.
    let raw = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| SummarizeError::Internal(format!("extraction task panicked: {e}")))?
        .map_err(|e| SummarizeError::CorruptFile {
            name: name.clone(),
            detail: e.to_string(),
        })?;

    let page_texts: Vec<&str> = raw.split('\x0C').collect();
    if page_texts.len() > config.max_pages {
        return Err(SummarizeError::PageLimitExceeded {
            name: doc.name.clone(),
            pages: page_texts.len(),
            limit: config.max_pages,
        });
    }

    let mut warnings = Vec::new();
    let mut pages = Vec::with_capacity(page_texts.len());
    let ocr_available = config.ocr_enabled && ocr::available().await;

    for (i, native) in page_texts.iter().enumerate() {
        let page_num = i + 1;
        let native = native.trim();
        let sparse = native.chars().count() < config.min_native_chars;

        if sparse && config.ocr_enabled {
            if ocr_available {
                match ocr::recognise_page(&doc.bytes, page_num, &config.ocr_language).await {
                    Ok(text) if !text.trim().is_empty() => {
                        debug!(page = page_num, "sparse page re-extracted via ocr");
                        pages.push(PageText {
                            page_num,
                            text,
                            method: ExtractionMethod::Ocr,
                        });
                        continue;
                    }
                    Ok(_) => {
                        warnings.push(PipelineWarning::ExtractionDegraded {
                            page: page_num,
                            detail: "OCR produced no text".to_string(),
                        });
                    }
                    Err(e) => {
                        warn!(page = page_num, error = %e, "ocr failed, keeping native text");
                        warnings.push(PipelineWarning::ExtractionDegraded {
                            page: page_num,
                            detail: e,
                        });
                    }
                }
            } else {
                warnings.push(PipelineWarning::ExtractionDegraded {
                    page: page_num,
                    detail: "OCR unavailable for sparse page".to_string(),
                });
            }
        }

        pages.push(PageText {
            page_num,
            text: native.to_string(),
            method: ExtractionMethod::Native,
        });
    }

    Ok(Extraction {
        text: ExtractedText { pages },
        warnings,
    })
}

// ── DOCX ─────────────────────────────────────────────────────────────────

static RE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>|<w:p/>").unwrap());
static RE_HEADING_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:pStyle[^>]*w:val="Heading(\d)""#).unwrap());
static RE_TEXT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<w:t[^>]*>(.*?)</w:t>").unwrap());

/// Pull paragraph text out of `word/document.xml`.
///
/// Heading-styled paragraphs become Markdown `#` headings so the chunker
/// still sees the document's section structure. DOCX has no fixed pages, so
/// the whole body is a single logical page extracted natively.
async fn extract_docx(doc: &Document) -> Result<Extraction, SummarizeError> {
    let bytes = doc.bytes.clone();
    let name = doc.name.clone();

    let body = tokio::task::spawn_blocking(move || read_docx_body(&bytes, &name))
        .await
        .map_err(|e| SummarizeError::Internal(format!("extraction task panicked: {e}")))??;

    let mut paragraphs = Vec::new();
    for para in RE_PARAGRAPH.find_iter(&body) {
        let xml = para.as_str();
        let text: String = RE_TEXT_RUN
            .captures_iter(xml)
            .map(|c| unescape_xml(&c[1]))
            .collect();
        let text = text.trim().to_string();
        if text.is_empty() {
            continue;
        }
        match RE_HEADING_STYLE.captures(xml) {
            Some(c) => {
                let level: usize = c[1].parse().unwrap_or(1);
                paragraphs.push(format!("{} {}", "#".repeat(level.clamp(1, 6)), text));
            }
            None => paragraphs.push(text),
        }
    }

    Ok(Extraction {
        text: ExtractedText {
            pages: vec![PageText {
                page_num: 1,
                text: paragraphs.join("\n\n"),
                method: ExtractionMethod::Native,
            }],
        },
        warnings: Vec::new(),
    })
}

fn read_docx_body(bytes: &[u8], name: &str) -> Result<String, SummarizeError> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).map_err(|e| SummarizeError::CorruptFile {
        name: name.to_string(),
        detail: format!("not a valid DOCX archive: {e}"),
    })?;
    let mut entry =
        archive
            .by_name("word/document.xml")
            .map_err(|e| SummarizeError::CorruptFile {
                name: name.to_string(),
                detail: format!("missing word/document.xml: {e}"),
            })?;
    let mut body = String::new();
    entry
        .read_to_string(&mut body)
        .map_err(|e| SummarizeError::CorruptFile {
            name: name.to_string(),
            detail: format!("unreadable document body: {e}"),
        })?;
    Ok(body)
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ── Text cleanup ─────────────────────────────────────────────────────────

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s)>\]]+").unwrap());
static RE_EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\w.+-]+@[\w.-]+\.\w+").unwrap());
static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Normalise extracted text: strip URLs and e-mail addresses, collapse
/// space runs, bound blank-line runs to one paragraph break.
pub fn clean_text(text: &str) -> String {
    let s = RE_URL.replace_all(text, "");
    let s = RE_EMAIL.replace_all(&s, "");
    let s = RE_SPACE_RUNS.replace_all(&s, " ");
    let s = RE_BLANK_RUNS.replace_all(&s, "\n\n");
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummaryConfig;

    #[test]
    fn clean_text_strips_urls_and_emails() {
        let s = clean_text("See https://example.org/paper and mail a.b@uni.edu for copies.");
        assert!(!s.contains("example.org"));
        assert!(!s.contains("@uni.edu"));
        assert!(s.starts_with("See"));
    }

    #[test]
    fn clean_text_preserves_paragraph_breaks() {
        let s = clean_text("first   paragraph\n\n\n\nsecond\tparagraph");
        assert_eq!(s, "first paragraph\n\nsecond paragraph");
    }

    #[test]
    fn unescape_handles_nested_entities() {
        assert_eq!(unescape_xml("a &amp; b &lt;c&gt;"), "a & b <c>");
    }

    #[test]
    fn docx_paragraphs_and_headings() {
        let xml = concat!(
            r#"<w:body>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Introduction</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t>First </w:t></w:r><w:r><w:t>sentence.</w:t></w:r></w:p>"#,
            r#"</w:body>"#
        );
        let mut out = Vec::new();
        for para in RE_PARAGRAPH.find_iter(xml) {
            let text: String = RE_TEXT_RUN
                .captures_iter(para.as_str())
                .map(|c| unescape_xml(&c[1]))
                .collect();
            let heading = RE_HEADING_STYLE.is_match(para.as_str());
            out.push((text, heading));
        }
        assert_eq!(
            out,
            vec![
                ("Introduction".to_string(), true),
                ("First sentence.".to_string(), false)
            ]
        );
    }

    #[tokio::test]
    async fn oversize_document_rejected_before_parse() {
        let config = SummaryConfig::builder().max_file_bytes(16).build().unwrap();
        let doc = Document::from_bytes("big.pdf", b"%PDF-1.4 and a lot more bytes".to_vec())
            .unwrap();
        let err = extract(&doc, &config).await.unwrap_err();
        assert!(matches!(err, SummarizeError::SizeLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn corrupt_pdf_reported() {
        let config = SummaryConfig::default();
        let doc = Document::from_bytes("bad.pdf", b"%PDF-1.7 truncated garbage".to_vec()).unwrap();
        let err = extract(&doc, &config).await.unwrap_err();
        assert!(
            matches!(
                err,
                SummarizeError::CorruptFile { .. } | SummarizeError::EmptyDocument { .. }
            ),
            "got: {err}"
        );
    }
}
