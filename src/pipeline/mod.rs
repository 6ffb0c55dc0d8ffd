//! Pipeline stages for document summarization.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different OCR backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ chunk ──▶ llm ──▶ outline
//! (pdf/docx   (bounded  (chunk   (mind-map
//!  + ocr)      spans)    calls    from merged
//!                        + merge) markdown)
//! ```
//!
//! 1. [`extract`] — validate limits, pull page-tagged text from PDF/DOCX,
//!    re-extract sparse pages via OCR; runs native parsing in
//!    `spawn_blocking` because the parsers are CPU-bound
//! 2. [`chunk`]   — split extracted text into budget-bounded chunks at
//!    paragraph, then sentence, boundaries
//! 3. [`llm`]     — drive the completion calls with retry/backoff; the only
//!    stage with network I/O
//! 4. [`outline`] — derive the hierarchical mind-map outline from the merged
//!    summary Markdown
//!
//! The [`ocr`] submodule is the external-process shim used by `extract`.

pub mod chunk;
pub mod extract;
pub mod llm;
pub mod ocr;
pub mod outline;
