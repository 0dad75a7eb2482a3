//! Reduce phase: merge per-chunk partial results into the final document.
//!
//! Partials are merged in ascending chunk order so the document follows the
//! meeting's chronology. Decision lists and action tables are concatenated
//! as extracted; deduplication is left to the model. When the concatenated
//! summary exceeds its token ceiling, a bounded number of compression
//! passes ask the generator to rewrite it shorter; if it is still over
//! after the last pass, it is hard-truncated at a word boundary and the
//! document is flagged `summary_truncated`.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

use crate::chunk::{estimate_tokens, CHARS_PER_TOKEN};
use crate::document::{Document, DocumentMetadata};
use crate::services::{Generator, RetryPolicy};

use super::{PartialResult, PromptBuilder};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Every chunk's extraction degraded; there is nothing to build a
    /// document from.
    #[error("extraction produced no usable content: all {0} chunks degraded")]
    AllChunksDegraded(usize),
}

// ---------------------------------------------------------------------------
// Reducer
// ---------------------------------------------------------------------------

/// Merges partial results and enforces the summary token ceiling.
pub struct Reducer {
    generator: Arc<dyn Generator>,
    policy: RetryPolicy,
    prompts: PromptBuilder,
    summary_token_ceiling: usize,
    max_passes: usize,
}

impl Reducer {
    pub fn new(
        generator: Arc<dyn Generator>,
        policy: RetryPolicy,
        prompts: PromptBuilder,
        summary_token_ceiling: usize,
        max_passes: usize,
    ) -> Self {
        Self {
            generator,
            policy,
            prompts,
            summary_token_ceiling,
            max_passes,
        }
    }

    /// Merge `partials` into a [`Document`] over the given transcript.
    ///
    /// Fails only when every partial is degraded; any other degradation is
    /// recorded in the document metadata instead.
    pub async fn reduce(
        &self,
        partials: &[PartialResult],
        meeting_date: NaiveDate,
        transcript: String,
        meeting_duration: Duration,
    ) -> Result<Document, SummarizeError> {
        if partials.iter().all(|p| p.degraded) {
            return Err(SummarizeError::AllChunksDegraded(partials.len()));
        }

        let mut ordered: Vec<&PartialResult> = partials.iter().collect();
        ordered.sort_by_key(|p| p.chunk_index);

        let mut decisions = Vec::new();
        let mut actions = Vec::new();
        let mut fragments = Vec::new();
        let mut degraded_chunks = Vec::new();

        for partial in &ordered {
            if partial.degraded {
                degraded_chunks.push(partial.chunk_index);
                continue;
            }
            if !partial.summary_fragment.is_empty() {
                fragments.push(partial.summary_fragment.as_str());
            }
            decisions.extend(partial.decisions.iter().cloned());
            actions.extend(partial.actions.iter().cloned());
        }

        let combined = fragments.join("\n\n");
        let (summary, truncated) = self
            .compress(combined, meeting_date, meeting_duration)
            .await;

        Ok(Document {
            meeting_date,
            summary,
            decisions,
            actions,
            transcript,
            metadata: DocumentMetadata {
                degraded_translation_chunks: Vec::new(),
                degraded_extraction_chunks: degraded_chunks,
                summary_truncated: truncated,
            },
        })
    }

    /// Bring `summary` under the token ceiling: up to `max_passes`
    /// generator rewrites, then a hard word-boundary truncation as the
    /// last resort. Returns the summary and whether it was truncated.
    async fn compress(
        &self,
        mut summary: String,
        meeting_date: NaiveDate,
        meeting_duration: Duration,
    ) -> (String, bool) {
        let word_budget = self.summary_token_ceiling * 3 / 4;
        let duration_minutes = meeting_duration.as_secs() / 60;

        let mut pass = 0;
        while estimate_tokens(&summary) > self.summary_token_ceiling && pass < self.max_passes {
            pass += 1;
            let prompt =
                self.prompts
                    .compression(&summary, word_budget, meeting_date, duration_minutes);
            match self.policy.run(|| self.generator.generate(&prompt)).await {
                Ok(compressed) => {
                    log::debug!(
                        "reduce: compression pass {pass}: {} -> {} tokens",
                        estimate_tokens(&summary),
                        estimate_tokens(compressed.trim())
                    );
                    summary = compressed.trim().to_owned();
                }
                Err(err) => {
                    log::warn!("reduce: compression pass {pass} failed ({err})");
                    break;
                }
            }
        }

        if estimate_tokens(&summary) > self.summary_token_ceiling {
            log::warn!(
                "reduce: summary still over ceiling after {pass} passes, truncating"
            );
            return (truncate_to_tokens(&summary, self.summary_token_ceiling), true);
        }
        (summary, false)
    }
}

/// Cut `text` at the last word boundary that fits `ceiling` estimated
/// tokens.
fn truncate_to_tokens(text: &str, ceiling: usize) -> String {
    let budget_chars = ceiling * CHARS_PER_TOKEN;
    let mut out = String::new();
    let mut used = 0usize;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        let cost = word_chars + usize::from(!out.is_empty());
        if used + cost > budget_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
        used += cost;
    }

    // A first word larger than the whole budget is cut mid-word; the
    // summary section must never truncate to nothing.
    if out.is_empty() {
        if let Some(word) = text.split_whitespace().next() {
            out = word.chars().take(budget_chars).collect();
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
