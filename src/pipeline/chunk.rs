//! Chunking: split extracted text into budget-bounded spans at semantic
//! boundaries.
//!
//! ## Splitting policy
//!
//! Paragraph boundaries are preferred; a paragraph over budget is split at
//! sentence boundaries; a single sentence over budget is hard-split at the
//! budget. Two invariants hold for every input:
//!
//! * no chunk ever exceeds the configured character budget;
//! * concatenating chunk texts in order reproduces the input, modulo
//!   boundary whitespace normalization.
//!
//! Chunks partition the text without overlap — each summarized span appears
//! in exactly one completion call, so partial summaries never double-count
//! content.

use crate::document::{Chunk, ExtractedText};

/// Split extracted text into ordered chunks of at most `max_chars`
/// characters, tagged with their source page range.
pub fn split_chunks(extracted: &ExtractedText, max_chars: usize) -> Vec<Chunk> {
    // Flatten to (paragraph, page) pairs; a page boundary is always a
    // paragraph boundary.
    let mut paragraphs: Vec<(&str, usize)> = Vec::new();
    for page in &extracted.pages {
        for para in page.text.split("\n\n") {
            let para = para.trim();
            if !para.is_empty() {
                paragraphs.push((para, page.page_num));
            }
        }
    }

    let mut builder = ChunkBuilder::new(max_chars);
    for (para, page) in paragraphs {
        if para.chars().count() > max_chars {
            // Oversized paragraph: flush what we have, then pack sentences.
            builder.flush();
            for sentence in split_sentences(para) {
                if sentence.chars().count() > max_chars {
                    builder.flush();
                    for piece in hard_split(&sentence, max_chars) {
                        builder.push_exclusive(piece, page);
                    }
                } else {
                    builder.push(&sentence, " ", page);
                }
            }
            builder.flush();
        } else {
            builder.push(para, "\n\n", page);
        }
    }
    builder.finish()
}

struct ChunkBuilder {
    max_chars: usize,
    chunks: Vec<Chunk>,
    current: String,
    current_chars: usize,
    pages: Option<(usize, usize)>,
}

impl ChunkBuilder {
    fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            chunks: Vec::new(),
            current: String::new(),
            current_chars: 0,
            pages: None,
        }
    }

    /// Append a span, starting a new chunk when the separator-joined length
    /// would exceed the budget.
    fn push(&mut self, span: &str, sep: &str, page: usize) {
        let span_chars = span.chars().count();
        let sep_chars = if self.current.is_empty() {
            0
        } else {
            sep.chars().count()
        };
        if self.current_chars + sep_chars + span_chars > self.max_chars {
            self.flush();
        }
        if !self.current.is_empty() {
            self.current.push_str(sep);
            self.current_chars += sep.chars().count();
        }
        self.current.push_str(span);
        self.current_chars += span_chars;
        self.pages = Some(match self.pages {
            Some((start, _)) => (start, page),
            None => (page, page),
        });
    }

    /// Emit a span as a chunk of its own (hard-split pieces).
    fn push_exclusive(&mut self, span: String, page: usize) {
        self.flush();
        self.current_chars = span.chars().count();
        self.current = span;
        self.pages = Some((page, page));
        self.flush();
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let text = std::mem::take(&mut self.current);
            let pages = self.pages.take().unwrap_or((1, 1));
            self.chunks.push(Chunk {
                index: self.chunks.len(),
                text,
                pages,
            });
            self.current_chars = 0;
        }
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.flush();
        self.chunks
    }
}

/// Split text into sentences, keeping terminators and inter-sentence
/// whitespace attached so concatenation is lossless.
///
/// Terminators cover both Western (`.!?`) and CJK (`。！？`) punctuation;
/// a split only happens when the terminator is followed by whitespace, so
/// decimals ("3.14") and versions stay intact.
fn split_sentences(text: &str) -> Vec<String> {
    const TERMINATORS: [char; 6] = ['.', '!', '?', '。', '！', '？'];

    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if TERMINATORS.contains(&c) {
            // Absorb any run of closing quotes/brackets and whitespace.
            while let Some(&next) = chars.peek() {
                if next == '"' || next == '\'' || next == ')' || next == '”' || next == '’' {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if chars.peek().map_or(true, |n| n.is_whitespace()) {
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() {
                        current.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                sentences.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

/// Split a single over-budget sentence into pieces of at most `max_chars`
/// characters, on character (not byte) boundaries.
fn hard_split(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ExtractionMethod, PageText};

    fn text_of(pages: &[(usize, &str)]) -> ExtractedText {
        ExtractedText {
            pages: pages
                .iter()
                .map(|(n, t)| PageText {
                    page_num: *n,
                    text: t.to_string(),
                    method: ExtractionMethod::Native,
                })
                .collect(),
        }
    }

    fn normalize_ws(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn paragraphs_pack_within_budget() {
        let text = text_of(&[(1, "alpha beta gamma.\n\ndelta epsilon.\n\nzeta eta theta.")]);
        let chunks = split_chunks(&text, 40);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.text.chars().count() <= 40, "over budget: {:?}", c.text);
        }
    }

    #[test]
    fn concatenation_roundtrips_modulo_whitespace() {
        let original = "First paragraph with words.\n\nSecond one. It has two sentences!\n\nThird paragraph here.";
        let text = text_of(&[(1, original)]);
        // Budgets chosen above the longest single sentence so no hard split
        // interleaves with the whitespace-joined comparison.
        for budget in [28, 40, 80, 500] {
            let chunks = split_chunks(&text, budget);
            let joined = chunks
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            assert_eq!(
                normalize_ws(&joined),
                normalize_ws(original),
                "budget {budget}"
            );
        }
    }

    #[test]
    fn oversized_paragraph_splits_at_sentences() {
        let para = "One short sentence. Another short sentence. A third short sentence.";
        let text = text_of(&[(1, para)]);
        let chunks = split_chunks(&text, 30);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.text.chars().count() <= 30);
        }
        // No sentence was cut mid-way: every chunk ends at a terminator
        // (plus optional trailing whitespace).
        for c in &chunks {
            let trimmed = c.text.trim_end();
            assert!(
                trimmed.ends_with('.') || trimmed.ends_with('!'),
                "mid-sentence split: {:?}",
                c.text
            );
        }
    }

    #[test]
    fn oversized_sentence_hard_splits_at_budget() {
        let sentence = "x".repeat(95);
        let text = text_of(&[(1, sentence.as_str())]);
        let chunks = split_chunks(&text, 30);
        assert_eq!(chunks.len(), 4); // 30 + 30 + 30 + 5
        for c in &chunks {
            assert!(c.text.chars().count() <= 30);
        }
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, sentence);
    }

    #[test]
    fn hard_split_respects_multibyte_chars() {
        let sentence = "模".repeat(10);
        let pieces = hard_split(&sentence, 4);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces.concat(), sentence);
    }

    #[test]
    fn chunks_carry_page_ranges() {
        let text = text_of(&[(1, "page one text."), (2, "page two text."), (3, "page three text.")]);
        let chunks = split_chunks(&text, 2000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].pages, (1, 3));

        let chunks = split_chunks(&text, 20);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].pages, (1, 1));
        assert_eq!(chunks[2].pages, (3, 3));
    }

    #[test]
    fn indices_are_sequential() {
        let text = text_of(&[(1, "a b c. d e f. g h i. j k l.")]);
        let chunks = split_chunks(&text, 10);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.index, i);
        }
    }

    #[test]
    fn decimal_points_do_not_split_sentences() {
        let sentences = split_sentences("The value is 3.14 exactly. Next sentence.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("3.14"));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let text = text_of(&[(1, "")]);
        assert!(split_chunks(&text, 100).is_empty());
    }
}
