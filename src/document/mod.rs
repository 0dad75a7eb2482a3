//! The final document model and its canonical Markdown rendering.
//!
//! A [`Document`] carries the executive summary, decision list, action
//! table, and full translated transcript, plus degradation metadata so the
//! caller can warn the end user when any content fell back to a
//! lower-quality path. [`Document::render`] produces the canonical
//! four-section Markdown that the [`Validator`](validate::Validator)
//! enforces before hand-off to an external renderer.

pub mod validate;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use validate::{LanguageDetector, ValidationError, Validator, WhatlangDetector};

// ---------------------------------------------------------------------------
// Canonical structure constants
// ---------------------------------------------------------------------------

/// The four required section headings, in the exact required order.
pub const SECTION_HEADINGS: [&str; 4] = [
    "### Executive summary",
    "### Decisions",
    "### Next actions",
    "### Full transcript",
];

/// Rendered in place of an empty decisions/actions section — those sections
/// are never left empty.
pub const EMPTY_PLACEHOLDER: &str = "(none)";

/// Header row of the actions table.
pub const ACTIONS_TABLE_HEADER: &str = "| Owner | Action | Deadline |";

// ---------------------------------------------------------------------------
// ActionItem
// ---------------------------------------------------------------------------

/// One row of the next-actions table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub owner: String,
    pub action: String,
    pub deadline: String,
}

// ---------------------------------------------------------------------------
// DocumentMetadata
// ---------------------------------------------------------------------------

/// Degradation markers accumulated across the run. Never silently dropped:
/// the renderer/caller uses these to warn the end user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Chunk indices whose translation fell back to source-language text.
    pub degraded_translation_chunks: Vec<usize>,
    /// Chunk indices whose extraction yielded an empty partial result.
    pub degraded_extraction_chunks: Vec<usize>,
    /// `true` when the summary was hard-truncated after the compression cap.
    pub summary_truncated: bool,
}

impl DocumentMetadata {
    /// `true` when any content in the document took a degraded path.
    pub fn is_degraded(&self) -> bool {
        self.summary_truncated
            || !self.degraded_translation_chunks.is_empty()
            || !self.degraded_extraction_chunks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The single reduced artifact of a pipeline run.
///
/// Produced once per run, validated, then handed off to the external
/// renderer; the pipeline holds no further reference afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub meeting_date: NaiveDate,
    /// Token-bounded executive summary.
    pub summary: String,
    pub decisions: Vec<String>,
    pub actions: Vec<ActionItem>,
    /// Full translated transcript, one `[HH:MM:SS] text` line per segment.
    pub transcript: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Render the canonical four-section Markdown document.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.transcript.len() + self.summary.len() + 512);

        out.push_str(SECTION_HEADINGS[0]);
        out.push_str("\n\n");
        out.push_str(self.summary.trim());
        out.push_str("\n\n");

        out.push_str(SECTION_HEADINGS[1]);
        out.push_str("\n\n");
        if self.decisions.is_empty() {
            out.push_str(EMPTY_PLACEHOLDER);
            out.push('\n');
        } else {
            for decision in &self.decisions {
                out.push_str("- ");
                out.push_str(decision.trim());
                out.push('\n');
            }
        }
        out.push('\n');

        out.push_str(SECTION_HEADINGS[2]);
        out.push_str("\n\n");
        if self.actions.is_empty() {
            out.push_str(EMPTY_PLACEHOLDER);
            out.push('\n');
        } else {
            out.push_str(ACTIONS_TABLE_HEADER);
            out.push('\n');
            out.push_str("|-------|--------|----------|\n");
            for action in &self.actions {
                out.push_str(&format!(
                    "| {} | {} | {} |\n",
                    action.owner.trim(),
                    action.action.trim(),
                    action.deadline.trim()
                ));
            }
        }
        out.push('\n');

        out.push_str(SECTION_HEADINGS[3]);
        out.push_str("\n\n");
        out.push_str(self.transcript.trim_end());
        out.push('\n');

        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
