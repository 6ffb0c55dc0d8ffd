//! Prompt templates for chunk summarization and summary merging.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the default behaviour (adding a
//!    section, tweaking the merge ordering) requires editing exactly one
//!    place.
//!
//! 2. **Configurability** — the merge step and outline behaviour are
//!    prompt-driven, not structural algorithms, so callers override them
//!    through [`PromptSet`] in [`crate::SummaryConfig`] rather than by
//!    patching pipeline code.

use crate::config::SummaryMode;

/// System message sent with every completion call.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a senior academic researcher who writes faithful, well-structured paper summaries.";

/// Concise mode: core points only, ~800 words.
pub const CONCISE_PROMPT: &str = r#"Summarize the following excerpt of an academic paper.

Cover, where the excerpt supports it:
1. Core research overview — background, motivation, main research problems, key contributions
2. Main findings — the 2-3 key findings, the methodology in brief, important results
3. Value and applications — theoretical significance, practical applications, future directions

Requirements:
- Focus on key points only
- Use clear and simple language, avoid jargon
- Ensure logical flow between sections"#;

/// Standard mode: methods, results and discussion, ~1500 words.
pub const STANDARD_PROMPT: &str = r#"Summarize the following excerpt of an academic paper.

Cover, where the excerpt supports it:
1. Research overview — background and significance, research problems and challenges, technical approach, main contributions
2. Methodology and results — research methodology, experimental design, key findings, performance analysis
3. Discussion and applications — result interpretation, theoretical implications, practical applications, future directions

Requirements:
- Balance depth and clarity
- Include important technical details
- Maintain academic rigor
- Use clear section transitions"#;

/// Detailed mode: in-depth analysis, ~2500 words.
pub const DETAILED_PROMPT: &str = r#"Summarize the following excerpt of an academic paper in depth.

Cover, where the excerpt supports it:
1. Comprehensive research overview — field background and current status, motivation and significance, technical challenges, innovations, objectives and scope
2. Technical details and results — theoretical foundation, technical approach, architecture, implementation details, experimental setup, result analysis, performance comparison
3. Discussion and future work — result interpretation, theoretical implications, practical significance, limitations, future directions, potential improvements

Requirements:
- Provide in-depth analysis with technical detail
- Support claims with data and evidence from the text
- Maintain academic style"#;

/// Merge prompt: combine partial summaries into one document summary.
pub const MERGE_PROMPT: &str = r#"The following are partial summaries of consecutive sections of one academic paper, in document order. Merge them into a single coherent summary.

Requirements:
- Combine key points from all parts and remove redundant information
- Preserve the document's structural ordering: background, then methods, then results, then discussion, where detectable
- Keep important technical details and evidence
- Maintain a consistent writing style and academic rigor
- Do not mention that the input was split into parts"#;

/// Prompt templates used by the Summarizer. Every field can be overridden;
/// defaults reproduce the built-in academic-summary behaviour.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub system: String,
    pub concise: String,
    pub standard: String,
    pub detailed: String,
    pub merge: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            concise: CONCISE_PROMPT.to_string(),
            standard: STANDARD_PROMPT.to_string(),
            detailed: DETAILED_PROMPT.to_string(),
            merge: MERGE_PROMPT.to_string(),
        }
    }
}

impl PromptSet {
    /// The mode-specific summary template.
    pub fn mode_prompt(&self, mode: SummaryMode) -> &str {
        match mode {
            SummaryMode::Concise => &self.concise,
            SummaryMode::Standard => &self.standard,
            SummaryMode::Detailed => &self.detailed,
        }
    }

    /// Build the full prompt for one chunk.
    ///
    /// `target_words` is proportional to the chunk's share of the document
    /// so partial summaries shrink the text evenly before the merge step.
    pub fn chunk_prompt(
        &self,
        mode: SummaryMode,
        chunk_text: &str,
        target_words: usize,
        language: Option<&str>,
    ) -> String {
        let mut prompt = format!(
            "{}\n\nTarget length: about {} words.\n",
            self.mode_prompt(mode),
            target_words
        );
        push_language(&mut prompt, language);
        prompt.push_str("\nInput text:\n");
        prompt.push_str(chunk_text);
        prompt
    }

    /// Build the final merge prompt over all partial summaries.
    pub fn merge_prompt(
        &self,
        partials: &[String],
        target_words: usize,
        language: Option<&str>,
    ) -> String {
        let mut prompt = format!(
            "{}\n\nTarget length: about {} words.\n",
            self.merge, target_words
        );
        push_language(&mut prompt, language);
        prompt.push_str("\nPartial summaries:\n");
        for (i, partial) in partials.iter().enumerate() {
            prompt.push_str(&format!("\n--- Part {} ---\n{}\n", i + 1, partial));
        }
        prompt
    }
}

fn push_language(prompt: &mut String, language: Option<&str>) {
    if let Some(lang) = language {
        prompt.push_str(&format!("Write the summary in {lang}.\n"));
    }
}
