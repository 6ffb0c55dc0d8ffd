//! OCR shim: rasterise one PDF page with `pdftoppm` and recognise it with
//! `tesseract`, both invoked as external processes.
//!
//! OCR is strictly best-effort. The binaries are probed once per process;
//! when either is missing the extractor records an
//! [`crate::error::PipelineWarning::ExtractionDegraded`] warning and keeps
//! the native text — OCR absence is never a hard failure.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

static OCR_AVAILABLE: OnceCell<bool> = OnceCell::const_new();

/// Whether both `pdftoppm` and `tesseract` respond on this system.
/// Probed once and cached for the process lifetime.
pub async fn available() -> bool {
    *OCR_AVAILABLE
        .get_or_init(|| async {
            let ok = probe("pdftoppm", &["-v"]).await && probe("tesseract", &["--version"]).await;
            if !ok {
                warn!("pdftoppm/tesseract not found; OCR fallback disabled for this run");
            }
            ok
        })
        .await
}

async fn probe(binary: &str, args: &[&str]) -> bool {
    Command::new(binary)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Recognise the text of one PDF page (1-indexed).
///
/// Writes the PDF to a temp dir, rasterises the single page at 300 DPI and
/// pipes the PNG through tesseract with the given language spec (e.g.
/// "eng+chi_sim+chi_tra"). Any process failure is reported as a plain
/// string so the extractor can downgrade it to a warning.
pub async fn recognise_page(
    pdf_bytes: &[u8],
    page_num: usize,
    language: &str,
) -> Result<String, String> {
    let dir = tempfile::tempdir().map_err(|e| format!("tempdir: {e}"))?;
    let pdf_path = dir.path().join("input.pdf");
    tokio::fs::write(&pdf_path, pdf_bytes)
        .await
        .map_err(|e| format!("write temp pdf: {e}"))?;

    let prefix = dir.path().join("page");
    run(
        "pdftoppm",
        &[
            "-f",
            &page_num.to_string(),
            "-l",
            &page_num.to_string(),
            "-r",
            "300",
            "-png",
            path_str(&pdf_path)?,
            path_str(&prefix)?,
        ],
    )
    .await?;

    // pdftoppm names the file page-<n>.png, zero-padding by page count.
    let png = find_rendered_png(dir.path()).await?;
    let output = run("tesseract", &[path_str(&png)?, "stdout", "-l", language]).await?;

    debug!(page = page_num, chars = output.len(), "ocr recognised page");
    Ok(output)
}

async fn find_rendered_png(dir: &Path) -> Result<std::path::PathBuf, String> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| format!("read tempdir: {e}"))?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| e.to_string())? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("png") {
            return Ok(path);
        }
    }
    Err("pdftoppm produced no image".to_string())
}

async fn run(binary: &str, args: &[&str]) -> Result<String, String> {
    let output = Command::new(binary)
        .args(args)
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("{binary}: {e}"))?;
    if !output.status.success() {
        return Err(format!(
            "{binary} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn path_str(path: &Path) -> Result<&str, String> {
    path.to_str().ok_or_else(|| "non-UTF-8 temp path".to_string())
}
