//! Mind-map outline extraction from the merged summary Markdown.
//!
//! The outline is derived structurally, not by another completion call:
//! headings become top-level topic nodes, list items beneath them become
//! children, and headingless prose contributes its leading sentences. Long
//! labels are truncated so the rendered tree stays scannable.

use crate::output::{Outline, OutlineNode};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s+(.+)$").unwrap());
static RE_LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:[-*]|\d+\.)\s+(.+)$").unwrap());
static RE_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_`]+").unwrap());

/// Build a hierarchical outline from summary Markdown.
///
/// `root` is the display name for the root node (usually the document name);
/// `max_label` bounds node label length before truncation.
pub fn build_outline(root: &str, markdown: &str, max_label: usize) -> Outline {
    let mut nodes: Vec<OutlineNode> = Vec::new();

    for line in markdown.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        if let Some(caps) = RE_HEADING.captures(line) {
            nodes.push(OutlineNode {
                label: clean_label(&caps[1], max_label),
                children: Vec::new(),
            });
            continue;
        }

        if let Some(caps) = RE_LIST_ITEM.captures(line) {
            let label = clean_label(&caps[1], max_label);
            match nodes.last_mut() {
                Some(section) => section.children.push(OutlineNode::leaf(label)),
                None => nodes.push(OutlineNode::leaf(label)),
            }
            continue;
        }

        // Plain prose: contribute the first sentence to the current section,
        // but only if the section has no list items yet — lists are the
        // better signal when both are present.
        if let Some(section) = nodes.last_mut() {
            if section.children.is_empty() {
                if let Some(sentence) = first_sentence(line) {
                    section.children.push(OutlineNode::leaf(clean_label(
                        &sentence, max_label,
                    )));
                }
            }
        }
    }

    Outline {
        root: root.to_string(),
        nodes,
    }
}

/// Strip emphasis markers, collapse whitespace and truncate on a char
/// boundary with an ellipsis.
fn clean_label(text: &str, max_label: usize) -> String {
    let stripped = RE_EMPHASIS.replace_all(text, "");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_label {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(max_label.saturating_sub(1)).collect();
    format!("{}…", truncated.trim_end())
}

fn first_sentence(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.chars().count() < 10 {
        return None;
    }
    let end = trimmed
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?' | '。' | '！' | '？'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(trimmed.len());
    Some(trimmed[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = "\
# Paper Summary

## Research Background
The work addresses scalable graph processing. Earlier systems struggled.

## Key Findings
- **Throughput** improved 3x over the baseline
- Memory use dropped by half
- A very long finding that keeps going on and on about implementation minutiae nobody needs in a node label

## Discussion
Results generalize to streaming settings.
";

    #[test]
    fn headings_become_topic_nodes() {
        let outline = build_outline("paper.pdf", SUMMARY, 60);
        assert_eq!(outline.root, "paper.pdf");
        let labels: Vec<&str> = outline.nodes.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Paper Summary",
                "Research Background",
                "Key Findings",
                "Discussion"
            ]
        );
    }

    #[test]
    fn list_items_become_children_with_emphasis_stripped() {
        let outline = build_outline("p", SUMMARY, 60);
        let findings = &outline.nodes[2];
        assert_eq!(findings.children.len(), 3);
        assert_eq!(findings.children[0].label, "Throughput improved 3x over the baseline");
    }

    #[test]
    fn long_labels_are_truncated() {
        let outline = build_outline("p", SUMMARY, 40);
        let long = &outline.nodes[2].children[2];
        assert!(long.label.chars().count() <= 40);
        assert!(long.label.ends_with('…'));
    }

    #[test]
    fn prose_contributes_first_sentence_when_no_list() {
        let outline = build_outline("p", SUMMARY, 60);
        let background = &outline.nodes[1];
        assert_eq!(background.children.len(), 1);
        assert_eq!(
            background.children[0].label,
            "The work addresses scalable graph processing."
        );
    }

    #[test]
    fn empty_markdown_gives_empty_outline() {
        let outline = build_outline("p", "", 60);
        assert!(outline.nodes.is_empty());
    }
}
