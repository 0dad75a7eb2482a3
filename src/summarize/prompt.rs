//! Prompt builder for the extraction map phase and the summary
//! compression pass.
//!
//! [`PromptBuilder`] constructs two prompts:
//! * **Extraction** — per-chunk: asks for a summary fragment, a decision
//!   list, and an owner/action/deadline table for that chunk's text alone.
//! * **Compression** — the "reduce of reduces": compresses concatenated
//!   summary fragments down to the word budget of the final document.
//!
//! Both instruct the model to answer in the configured target language and
//! to write the literal `(none)` for empty lists, matching the structure
//! the response parser and the document validator expect.

// ---------------------------------------------------------------------------
// Instruction templates
// ---------------------------------------------------------------------------

const EXTRACTION_INSTRUCTION: &str = "\
You are a senior corporate minute-taker. From the meeting transcript \
excerpt below, extract exactly three sections, using these headings:

Summary:
A brief summary of this excerpt (about 50 words).

Decisions:
- One bullet per objective decision taken in this excerpt.

Actions:
| Owner | Action | Deadline |
|-------|--------|----------|
One table row per agreed next action.

Write `(none)` under a heading when the excerpt contains no decisions or \
no actions. Reply with only the three sections — no explanation.";

const COMPRESSION_INSTRUCTION: &str = "\
You are a senior corporate minute-taker. Rewrite the meeting summary \
fragments below as one coherent executive summary of at most {words} \
words. Mention the meeting date {date} in the first sentence. Reply with \
only the summary text — no headings, no explanation.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds extraction and compression prompts in the configured target
/// language.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    target_language: String,
}

impl PromptBuilder {
    /// Create a builder for the given ISO-639-1 target language code.
    pub fn new(target_language: &str) -> Self {
        Self {
            target_language: target_language.to_owned(),
        }
    }

    /// Per-chunk extraction prompt (map phase).
    pub fn extraction(&self, chunk_text: &str) -> String {
        format!(
            "{EXTRACTION_INSTRUCTION}\n\nWrite every sentence in the target \
             language `{lang}`.\n\nTranscript excerpt:\n{chunk_text}",
            lang = self.target_language,
        )
    }

    /// Summary compression prompt (reduce of reduces).
    ///
    /// `word_budget` is the maximum word count of the compressed summary;
    /// `meeting_date` and `duration_minutes` give the model the framing
    /// facts for the opening sentence.
    pub fn compression(
        &self,
        fragments: &str,
        word_budget: usize,
        meeting_date: chrono::NaiveDate,
        duration_minutes: u64,
    ) -> String {
        let instruction = COMPRESSION_INSTRUCTION
            .replace("{words}", &word_budget.to_string())
            .replace("{date}", &meeting_date.to_string());
        format!(
            "{instruction}\n\nMeeting duration: {duration_minutes} minutes.\n\
             Write every sentence in the target language `{lang}`.\n\n\
             Summary fragments:\n{fragments}",
            lang = self.target_language,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
