//! Structural validation of the generated document.
//!
//! [`Validator::validate`] enforces the canonical contract on the rendered
//! document, in rule order: section presence and order, actions-table
//! columns, empty-section placeholders, summary token ceiling, and
//! target-language purity. The first violated rule is returned as a
//! [`ValidationError`]; the caller may re-run the Reducer a bounded number
//! of times before surfacing a terminal failure.

use thiserror::Error;

use crate::chunk::estimate_tokens;
use crate::config::PipelineConfig;

use super::{Document, ACTIONS_TABLE_HEADER, EMPTY_PLACEHOLDER, SECTION_HEADINGS};

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// A violated rule of the document structure contract.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required section heading is absent.
    #[error("missing required section `{0}`")]
    MissingSection(&'static str),

    /// Headings present but not in the required order, or extra sections.
    #[error("unexpected section structure: expected `{expected}`, found `{found}`")]
    SectionStructure { expected: String, found: String },

    /// The actions table does not carry exactly the owner/action/deadline
    /// columns.
    #[error("actions table must have columns `{ACTIONS_TABLE_HEADER}`, found `{0}`")]
    ActionTableColumns(String),

    /// A list section was rendered empty instead of the placeholder.
    #[error("section `{0}` is empty — expected the `(none)` placeholder")]
    EmptyListSection(&'static str),

    /// The summary exceeds the configured token ceiling.
    #[error("summary is {actual} tokens, ceiling is {ceiling}")]
    SummaryOverBudget { actual: usize, ceiling: usize },

    /// Too little of the document is written in the target language.
    #[error("target-language fraction {actual:.3} below threshold {threshold:.3}")]
    LanguagePurity { actual: f64, threshold: f64 },
}

// ---------------------------------------------------------------------------
// LanguageDetector
// ---------------------------------------------------------------------------

/// Per-token language identification seam, so the purity rule is testable
/// with a deterministic fake.
pub trait LanguageDetector: Send + Sync {
    /// ISO-639-3 code of the most likely language of `token`, or `None`
    /// when identification is not possible.
    fn detect(&self, token: &str) -> Option<&'static str>;
}

/// Default detector backed by `whatlang`.
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, token: &str) -> Option<&'static str> {
        whatlang::detect(token).map(|info| info.lang().code())
    }
}

/// Map the configured ISO-639-1 target code onto the ISO-639-3 code the
/// detector reports. Unknown codes pass through unchanged so a 639-3 value
/// in the config also works.
fn iso639_3(code: &str) -> &str {
    match code {
        "pt" => "por",
        "en" => "eng",
        "es" => "spa",
        "fr" => "fra",
        "de" => "deu",
        "it" => "ita",
        "nl" => "nld",
        "ru" => "rus",
        "ja" => "jpn",
        "zh" => "cmn",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Enforces the canonical document structure contract before hand-off.
pub struct Validator {
    target_language: String,
    summary_token_ceiling: usize,
    language_purity_threshold: f64,
    detector: Box<dyn LanguageDetector>,
}

impl Validator {
    /// Build a validator from the pipeline configuration, using the
    /// `whatlang`-backed detector.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            target_language: iso639_3(&config.target_language).to_owned(),
            summary_token_ceiling: config.summary_token_ceiling,
            language_purity_threshold: config.language_purity_threshold,
            detector: Box::new(WhatlangDetector),
        }
    }

    /// Replace the language detector (tests use a deterministic fake).
    pub fn with_detector(mut self, detector: Box<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Check the draft against the contract; the first violated rule wins.
    pub fn validate(&self, draft: &Document) -> Result<(), ValidationError> {
        let rendered = draft.render();

        self.check_sections(&rendered)?;
        self.check_actions_table(&rendered)?;
        self.check_placeholders(&rendered)?;
        self.check_summary_budget(draft)?;
        self.check_language_purity(draft)?;

        log::debug!("validate: document passed all structural rules");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rules, in contract order
    // -----------------------------------------------------------------------

    /// (a) exactly the four required sections, in the required order.
    fn check_sections(&self, rendered: &str) -> Result<(), ValidationError> {
        let found: Vec<&str> = rendered
            .lines()
            .map(str::trim_end)
            .filter(|line| line.starts_with("### "))
            .collect();

        for heading in SECTION_HEADINGS {
            if !found.contains(&heading) {
                return Err(ValidationError::MissingSection(heading));
            }
        }
        if found != SECTION_HEADINGS {
            return Err(ValidationError::SectionStructure {
                expected: SECTION_HEADINGS.join(", "),
                found: found.join(", "),
            });
        }
        Ok(())
    }

    /// (b) the actions table, when present, has exactly the three columns.
    fn check_actions_table(&self, rendered: &str) -> Result<(), ValidationError> {
        let body = section_body(rendered, SECTION_HEADINGS[2]);
        let mut rows = body.lines().map(str::trim).filter(|l| l.starts_with('|'));

        let Some(header) = rows.next() else {
            return Ok(()); // placeholder case; rule (c) covers emptiness
        };
        if normalize_row(header) != normalize_row(ACTIONS_TABLE_HEADER) {
            return Err(ValidationError::ActionTableColumns(header.to_owned()));
        }
        for row in rows.filter(|r| !is_divider_row(r)) {
            let cells = row.trim_matches('|').split('|').count();
            if cells != 3 {
                return Err(ValidationError::ActionTableColumns(row.to_owned()));
            }
        }
        Ok(())
    }

    /// (c) decisions/actions sections are never empty — placeholder instead.
    fn check_placeholders(&self, rendered: &str) -> Result<(), ValidationError> {
        for heading in [SECTION_HEADINGS[1], SECTION_HEADINGS[2]] {
            if section_body(rendered, heading).trim().is_empty() {
                return Err(ValidationError::EmptyListSection(heading));
            }
        }
        Ok(())
    }

    /// (d) summary token estimate within the configured ceiling.
    fn check_summary_budget(&self, draft: &Document) -> Result<(), ValidationError> {
        let actual = estimate_tokens(&draft.summary);
        if actual > self.summary_token_ceiling {
            return Err(ValidationError::SummaryOverBudget {
                actual,
                ceiling: self.summary_token_ceiling,
            });
        }
        Ok(())
    }

    /// (e) target-language fraction of whitespace-delimited tokens.
    ///
    /// Measured over the document's own content (summary, decisions, action
    /// cells, transcript). The fixed headings and table header the renderer
    /// injects are not the generated text's language and are not charged.
    fn check_language_purity(&self, draft: &Document) -> Result<(), ValidationError> {
        let mut counted = 0usize;
        let mut hits = 0usize;

        let action_cells = draft
            .actions
            .iter()
            .flat_map(|a| [a.owner.as_str(), a.action.as_str(), a.deadline.as_str()]);
        let pieces = std::iter::once(draft.summary.as_str())
            .chain(draft.decisions.iter().map(String::as_str))
            .chain(action_cells)
            .chain(std::iter::once(draft.transcript.as_str()));

        for token in pieces.flat_map(str::split_whitespace) {
            let word: String = token.chars().filter(|c| c.is_alphabetic()).collect();
            // Short tokens (articles, offsets, table pipes) carry no signal.
            if word.chars().count() < 4 {
                continue;
            }
            counted += 1;
            if self.detector.detect(&word) == Some(self.target_language.as_str()) {
                hits += 1;
            }
        }

        let actual = if counted == 0 {
            1.0
        } else {
            hits as f64 / counted as f64
        };
        if actual < self.language_purity_threshold {
            return Err(ValidationError::LanguagePurity {
                actual,
                threshold: self.language_purity_threshold,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Section helpers
// ---------------------------------------------------------------------------

/// The body text between `heading` and the next `### ` heading (or EOF).
fn section_body<'a>(rendered: &'a str, heading: &str) -> &'a str {
    let Some(start) = rendered.find(heading) else {
        return "";
    };
    let after = &rendered[start + heading.len()..];
    match after.find("\n### ") {
        Some(end) => &after[..end],
        None => after,
    }
}

fn normalize_row(row: &str) -> Vec<String> {
    row.trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_lowercase())
        .collect()
}

fn is_divider_row(row: &str) -> bool {
    row.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
