//! Extraction map phase: one generative call per translated chunk.
//!
//! Each chunk is sent to the [`Generator`] with an extraction prompt and
//! the plain-text response is parsed into a [`PartialResult`] (summary
//! fragment, decisions, actions). Transient failures are retried with
//! backoff; exhausted retries produce an empty partial flagged `degraded`
//! instead of aborting the run. Chunks are processed concurrently on a
//! bounded worker pool and results are returned in ascending chunk order.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::document::ActionItem;
use crate::services::{Generator, RetryPolicy};
use crate::translate::{TranslatedChunk, SEGMENT_SEPARATOR};

use super::PromptBuilder;

// ---------------------------------------------------------------------------
// PartialResult
// ---------------------------------------------------------------------------

/// What one chunk contributed to the final document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialResult {
    pub chunk_index: usize,
    /// Summary prose for this chunk; empty when `degraded`.
    pub summary_fragment: String,
    pub decisions: Vec<String>,
    pub actions: Vec<ActionItem>,
    /// `true` when extraction failed and this partial carries no content.
    pub degraded: bool,
}

impl PartialResult {
    fn empty(chunk_index: usize) -> Self {
        Self {
            chunk_index,
            summary_fragment: String::new(),
            decisions: Vec::new(),
            actions: Vec::new(),
            degraded: true,
        }
    }
}

/// Result of [`Extractor::extract_all`]: index-ordered partials plus how
/// many chunks were abandoned at the run deadline.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub partials: Vec<PartialResult>,
    pub abandoned: usize,
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Matches a section heading line, tolerating `#` prefixes, `**bold**`
/// markers, and inline content after a colon. A bare heading word or a
/// colon is required so prose that merely starts with a heading word does
/// not switch sections.
static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:#+\s*)?\*{0,2}(summary|decisions|actions)\*{0,2}\s*(?::\s*(.*))?\s*$")
        .expect("valid heading regex")
});

/// Matches a bullet prefix: `- `, `* `, `• `, or `1.`/`1)` numbering.
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+").expect("valid bullet regex"));

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Summary,
    Decisions,
    Actions,
}

fn is_placeholder(line: &str) -> bool {
    let trimmed = line.trim().trim_matches(|c| c == '*' || c == '_');
    trimmed.eq_ignore_ascii_case("(none)")
        || trimmed.eq_ignore_ascii_case("(nenhuma)")
        || trimmed.eq_ignore_ascii_case("(nenhum)")
}

fn is_divider_row(cells: &[&str]) -> bool {
    cells
        .iter()
        .all(|cell| !cell.is_empty() && cell.chars().all(|c| c == '-' || c == ':'))
}

/// Parse one table/bullet line inside the `Actions` section.
fn parse_action_line(line: &str) -> Option<ActionItem> {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') {
        return None;
    }
    let cells: Vec<&str> = trimmed
        .trim_matches('|')
        .split('|')
        .map(str::trim)
        .collect();
    if cells.len() < 3 || is_divider_row(&cells) {
        return None;
    }
    // Skip the header row the prompt asks the model to repeat.
    if cells[0].eq_ignore_ascii_case("owner") {
        return None;
    }
    Some(ActionItem {
        owner: cells[0].to_owned(),
        action: cells[1].to_owned(),
        deadline: cells[2].to_owned(),
    })
}

/// Parse a raw extraction response into a [`PartialResult`].
///
/// The parser is deliberately forgiving about formatting: models vary in
/// heading markup and bullet style, and a partially parseable response is
/// always better than a degraded empty one.
pub fn parse_extraction(chunk_index: usize, response: &str) -> PartialResult {
    let mut summary_lines: Vec<&str> = Vec::new();
    let mut decisions: Vec<String> = Vec::new();
    let mut actions: Vec<ActionItem> = Vec::new();
    let mut section = Section::None;

    for line in response.lines() {
        if let Some(caps) = HEADING_RE.captures(line) {
            let heading = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
            section = match heading.as_deref() {
                Some("summary") => Section::Summary,
                Some("decisions") => Section::Decisions,
                Some("actions") => Section::Actions,
                _ => section,
            };
            // Content inline after the colon belongs to the new section.
            if let Some(rest) = caps.get(2).map(|m| m.as_str().trim().trim_matches('*')) {
                if !rest.is_empty() && section == Section::Summary {
                    summary_lines.push(rest);
                }
            }
            continue;
        }

        if line.trim().is_empty() || is_placeholder(line) {
            continue;
        }

        match section {
            Section::Summary => summary_lines.push(line.trim()),
            Section::Decisions => {
                let stripped = BULLET_RE.replace(line, "");
                let decision = stripped.trim();
                if !decision.is_empty() {
                    decisions.push(decision.to_owned());
                }
            }
            Section::Actions => {
                if let Some(action) = parse_action_line(line) {
                    actions.push(action);
                }
            }
            Section::None => {}
        }
    }

    let summary_fragment = summary_lines.join(" ");
    let degraded = summary_fragment.is_empty() && decisions.is_empty() && actions.is_empty();
    PartialResult {
        chunk_index,
        summary_fragment,
        decisions,
        actions,
        degraded,
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Drives the concurrent extraction map phase over translated chunks.
pub struct Extractor {
    generator: Arc<dyn Generator>,
    policy: RetryPolicy,
    prompts: PromptBuilder,
    workers: usize,
}

impl Extractor {
    pub fn new(
        generator: Arc<dyn Generator>,
        policy: RetryPolicy,
        prompts: PromptBuilder,
        workers: usize,
    ) -> Self {
        Self {
            generator,
            policy,
            prompts,
            workers: workers.max(1),
        }
    }

    /// Extract a [`PartialResult`] from each chunk, abandoning calls still
    /// in flight at `deadline`. Partials come back in ascending chunk order;
    /// failed chunks yield an empty degraded partial rather than an error.
    pub async fn extract_all(
        &self,
        chunks: &[TranslatedChunk],
        deadline: Instant,
    ) -> ExtractionOutcome {
        let pool = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            // Segment separators are transport plumbing, not prose.
            let text = chunk.text.replace(SEGMENT_SEPARATOR, " ");
            let prompt = self.prompts.extraction(&text);

            let generator = Arc::clone(&self.generator);
            let policy = self.policy.clone();
            let pool = Arc::clone(&pool);
            let index = chunk.index;

            handles.push(tokio::spawn(async move {
                let _permit = pool.acquire_owned().await.expect("worker pool closed");

                let attempt =
                    tokio::time::timeout_at(deadline, policy.run(|| generator.generate(&prompt)))
                        .await;

                match attempt {
                    Ok(Ok(response)) => (parse_extraction(index, &response), false),
                    Ok(Err(err)) => {
                        log::warn!("extract: chunk {index} degraded ({err})");
                        (PartialResult::empty(index), false)
                    }
                    Err(_) => {
                        log::warn!("extract: chunk {index} abandoned at run deadline");
                        (PartialResult::empty(index), true)
                    }
                }
            }));
        }

        let mut partials = Vec::with_capacity(chunks.len());
        let mut abandoned = 0usize;
        for (handle, chunk) in handles.into_iter().zip(chunks) {
            match handle.await {
                Ok((partial, hit_deadline)) => {
                    if hit_deadline {
                        abandoned += 1;
                    }
                    partials.push(partial);
                }
                Err(join_err) => {
                    log::error!("extract: worker task failed: {join_err}");
                    partials.push(PartialResult::empty(chunk.index));
                }
            }
        }

        partials.sort_by_key(|p| p.chunk_index);

        let degraded = partials.iter().filter(|p| p.degraded).count();
        log::debug!(
            "extract: {} partials, {degraded} degraded, {abandoned} abandoned",
            partials.len()
        );
        ExtractionOutcome { partials, abandoned }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use async_trait::async_trait;
    use std::time::Duration;

    // -----------------------------------------------------------------------
    // Response parsing
    // -----------------------------------------------------------------------

    const FULL_RESPONSE: &str = "\
Summary:
A equipa reviu o orçamento e discutiu o plano de lançamento.

Decisions:
- Adiar o lançamento para outubro
- Manter o orçamento atual

Actions:
| Owner | Action | Deadline |
|-------|--------|----------|
| Ana | Atualizar o cronograma | 2026-09-01 |
| Rui | Rever o contrato | (sem prazo) |
";

    #[test]
    fn parses_a_well_formed_response() {
        let partial = parse_extraction(3, FULL_RESPONSE);

        assert_eq!(partial.chunk_index, 3);
        assert!(!partial.degraded);
        assert_eq!(
            partial.summary_fragment,
            "A equipa reviu o orçamento e discutiu o plano de lançamento."
        );
        assert_eq!(
            partial.decisions,
            vec!["Adiar o lançamento para outubro", "Manter o orçamento atual"]
        );
        assert_eq!(
            partial.actions,
            vec![
                ActionItem {
                    owner: "Ana".into(),
                    action: "Atualizar o cronograma".into(),
                    deadline: "2026-09-01".into(),
                },
                ActionItem {
                    owner: "Rui".into(),
                    action: "Rever o contrato".into(),
                    deadline: "(sem prazo)".into(),
                },
            ]
        );
    }

    #[test]
    fn tolerates_markdown_headings_and_numbered_bullets() {
        let response = "\
## Summary
Curto resumo.

**Decisions:**
1. Primeira decisão
2) Segunda decisão

### Actions
(none)
";
        let partial = parse_extraction(0, response);

        assert_eq!(partial.summary_fragment, "Curto resumo.");
        assert_eq!(partial.decisions, vec!["Primeira decisão", "Segunda decisão"]);
        assert!(partial.actions.is_empty());
        assert!(!partial.degraded);
    }

    #[test]
    fn placeholder_sections_stay_empty() {
        let response = "Summary:\nAlgo aconteceu.\n\nDecisions:\n(none)\n\nActions:\n(nenhuma)\n";
        let partial = parse_extraction(0, response);

        assert!(partial.decisions.is_empty());
        assert!(partial.actions.is_empty());
        assert!(!partial.degraded);
    }

    /// Prose that happens to start with a heading word must not switch
    /// sections.
    #[test]
    fn heading_words_inside_prose_do_not_open_sections() {
        let response = "\
Summary:
Decisions sobre o orçamento foram adiadas para a próxima reunião.

Decisions:
(none)

Actions:
(none)
";
        let partial = parse_extraction(0, response);

        assert_eq!(
            partial.summary_fragment,
            "Decisions sobre o orçamento foram adiadas para a próxima reunião."
        );
        assert!(partial.decisions.is_empty());
    }

    #[test]
    fn inline_summary_after_the_colon_is_kept() {
        let partial = parse_extraction(0, "Summary: tudo bem.\nDecisions:\n(none)\nActions:\n(none)");
        assert_eq!(partial.summary_fragment, "tudo bem.");
    }

    #[test]
    fn content_free_response_is_degraded() {
        let partial = parse_extraction(7, "I cannot help with that.");
        assert!(partial.degraded);
        assert!(partial.summary_fragment.is_empty());
        assert_eq!(partial.chunk_index, 7);
    }

    #[test]
    fn header_and_divider_rows_are_not_actions() {
        let response = "\
Actions:
| Owner | Action | Deadline |
|---|---|---|
| Eva | Enviar ata | amanhã |
";
        let partial = parse_extraction(0, response);
        assert_eq!(partial.actions.len(), 1);
        assert_eq!(partial.actions[0].owner, "Eva");
    }

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Echoes a canned response whose summary names the chunk, with latency
    /// chosen so later chunks complete first.
    struct SlowEcho;

    #[async_trait]
    impl Generator for SlowEcho {
        async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
            let index: u64 = prompt
                .split("chunk ")
                .nth(1)
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(30u64.saturating_sub(index * 5))).await;
            Ok(format!(
                "Summary:\nresumo do chunk {index}.\n\nDecisions:\n(none)\n\nActions:\n(none)"
            ))
        }
    }

    /// Fails permanently when the prompt carries the needle.
    struct FailOn {
        needle: String,
    }

    #[async_trait]
    impl Generator for FailOn {
        async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
            if prompt.contains(&self.needle) {
                Err(ServiceError::Permanent("refused".into()))
            } else {
                Ok("Summary:\nok.\nDecisions:\n(none)\nActions:\n(none)".into())
            }
        }
    }

    /// Never completes within any reasonable deadline.
    struct StuckGenerator;

    #[async_trait]
    impl Generator for StuckGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, ServiceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn translated_chunks(n: usize) -> Vec<TranslatedChunk> {
        (0..n)
            .map(|i| TranslatedChunk {
                index: i,
                text: format!("texto do chunk {i} traduzido"),
                degraded: false,
            })
            .collect()
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
    }

    fn extractor(generator: Arc<dyn Generator>, workers: usize) -> Extractor {
        Extractor::new(generator, fast_policy(), PromptBuilder::new("pt"), workers)
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(30)
    }

    // -----------------------------------------------------------------------
    // Map phase
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn partials_come_back_in_chunk_order() {
        let ex = extractor(Arc::new(SlowEcho), 8);
        let chunks = translated_chunks(5);

        let outcome = ex.extract_all(&chunks, far_deadline()).await;

        assert_eq!(outcome.partials.len(), 5);
        assert_eq!(outcome.abandoned, 0);
        for (i, partial) in outcome.partials.iter().enumerate() {
            assert_eq!(partial.chunk_index, i);
            assert!(partial.summary_fragment.contains(&format!("chunk {i}")));
        }
    }

    #[tokio::test]
    async fn permanent_failure_yields_empty_degraded_partial() {
        let ex = extractor(
            Arc::new(FailOn {
                needle: "chunk 1".into(),
            }),
            4,
        );
        let chunks = translated_chunks(3);

        let outcome = ex.extract_all(&chunks, far_deadline()).await;

        assert!(!outcome.partials[0].degraded);
        assert!(outcome.partials[1].degraded);
        assert!(outcome.partials[1].summary_fragment.is_empty());
        assert!(!outcome.partials[2].degraded);
    }

    #[tokio::test]
    async fn deadline_abandons_in_flight_chunks() {
        let ex = extractor(Arc::new(StuckGenerator), 4);
        let chunks = translated_chunks(2);
        let deadline = Instant::now() + Duration::from_millis(20);

        let outcome = ex.extract_all(&chunks, deadline).await;

        assert_eq!(outcome.partials.len(), 2);
        assert_eq!(outcome.abandoned, 2);
        assert!(outcome.partials.iter().all(|p| p.degraded));
    }
}
