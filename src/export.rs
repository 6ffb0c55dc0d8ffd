//! Export: render summaries to Markdown, write them atomically, and bundle
//! batches into a zip archive.
//!
//! Writes use temp-file-plus-rename so a crash mid-write never leaves a
//! half-written export next to good ones. Archive bundling renders entirely
//! in memory first; the archive file itself gets the same atomic treatment.

use crate::error::SummarizeError;
use crate::output::{Outline, OutlineNode, Summary};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Render one summary as a standalone Markdown document.
pub fn render_markdown(summary: &Summary) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Summary: {}\n\n", summary.source_name));
    out.push_str(&format!("- Mode: {}\n", summary.mode));
    out.push_str(&format!("- Status: {}\n", summary.status().as_str()));
    out.push_str(&format!(
        "- Source fingerprint: {}\n",
        &summary.fingerprint[..summary.fingerprint.len().min(16)]
    ));
    if summary.stats.total_pages > 0 {
        out.push_str(&format!("- Pages: {}\n", summary.stats.total_pages));
    }
    out.push('\n');

    if !summary.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for warning in &summary.warnings {
            out.push_str(&format!("- {}\n", warning));
        }
        out.push('\n');
    }

    out.push_str(summary.text.trim_end());
    out.push('\n');

    if let Some(ref outline) = summary.outline {
        out.push_str("\n## Mind map\n\n");
        out.push_str(&render_outline(outline));
    }

    out
}

/// Render an outline as a nested Markdown list.
pub fn render_outline(outline: &Outline) -> String {
    let mut out = format!("- {}\n", outline.root);
    for node in &outline.nodes {
        render_node(node, 1, &mut out);
    }
    out
}

fn render_node(node: &OutlineNode, depth: usize, out: &mut String) {
    out.push_str(&format!("{}- {}\n", "  ".repeat(depth), node.label));
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}

/// Write one summary's Markdown to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_summary(
    summary: &Summary,
    output_path: impl AsRef<Path>,
) -> Result<(), SummarizeError> {
    let path = output_path.as_ref();
    let markdown = render_markdown(summary);
    write_atomic(path, markdown.as_bytes()).await?;
    info!(path = %path.display(), "summary exported");
    Ok(())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SummarizeError> {
    let export_err = |source: std::io::Error| SummarizeError::ExportFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(export_err)?;
        }
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, bytes).await.map_err(export_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(export_err)?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "export".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Bundle several summaries into a zip archive in memory.
///
/// The archive holds one `.md` file per summary plus a `README.md` manifest
/// listing what was exported.
pub fn archive_bytes(summaries: &[Summary]) -> Result<Vec<u8>, SummarizeError> {
    let archive_err = |detail: String| SummarizeError::Internal(format!("archive: {detail}"));

    let cursor = std::io::Cursor::new(Vec::new());
    let mut zip = zip::ZipWriter::new(cursor);
    let options = zip::write::SimpleFileOptions::default();

    // Entry names are fixed up front so the manifest lists exactly what the
    // archive contains.
    let names = entry_names(summaries);
    for (summary, name) in summaries.iter().zip(&names) {
        zip.start_file(name.clone(), options)
            .map_err(|e| archive_err(e.to_string()))?;
        zip.write_all(render_markdown(summary).as_bytes())
            .map_err(|e| archive_err(e.to_string()))?;
    }

    zip.start_file("README.md", options)
        .map_err(|e| archive_err(e.to_string()))?;
    zip.write_all(render_manifest(summaries, &names).as_bytes())
        .map_err(|e| archive_err(e.to_string()))?;

    let cursor = zip.finish().map_err(|e| archive_err(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Unique archive entry name per summary. Duplicate stems are disambiguated
/// with a fingerprint prefix, then a counter for identical content uploaded
/// under the same name more than twice.
fn entry_names(summaries: &[Summary]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::with_capacity(summaries.len());
    for summary in summaries {
        let stem = markdown_stem(&summary.source_name);
        let mut name = format!("{stem}.md");
        if seen.contains(&name) {
            let fp = &summary.fingerprint[..8.min(summary.fingerprint.len())];
            name = format!("{stem}-{fp}.md");
            let mut n = 2;
            while seen.contains(&name) {
                name = format!("{stem}-{fp}-{n}.md");
                n += 1;
            }
        }
        seen.insert(name.clone());
        names.push(name);
    }
    names
}

/// Write a batch archive to disk atomically.
pub async fn write_archive(
    summaries: &[Summary],
    output_path: impl AsRef<Path>,
) -> Result<(), SummarizeError> {
    let path = output_path.as_ref();
    let bytes = archive_bytes(summaries)?;
    write_atomic(path, &bytes).await?;
    info!(path = %path.display(), files = summaries.len(), "batch archive exported");
    Ok(())
}

fn markdown_stem(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("summary");
    // Keep archive entry names portable.
    stem.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn render_manifest(summaries: &[Summary], names: &[String]) -> String {
    let mut out = String::from("# Summary export\n\n");
    out.push_str(&format!("- Documents: {}\n", summaries.len()));
    if let Some(first) = summaries.first() {
        out.push_str(&format!("- Mode: {}\n", first.mode));
    }
    out.push_str("\n## Files\n\n");
    for (summary, name) in summaries.iter().zip(names) {
        out.push_str(&format!(
            "- `{}` — {} ({})\n",
            name,
            summary.source_name,
            summary.status().as_str()
        ));
    }
    out.push_str(
        "\nEach file contains one document's summary: research background, \
         methods, results and key findings, with any extraction warnings \
         listed at the top.\n",
    );
    out
}
