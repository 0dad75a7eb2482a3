//! Pipeline runner — drives the full ingest → chunk → translate → extract
//! → reduce → validate flow.
//!
//! # Pipeline flow
//!
//! ```text
//! raw captions
//!   └─▶ ingest::parse                        ordered Vec<Segment>
//!         └─▶ chunk::chunk_segments          token-bounded chunks
//!               └─▶ TranslationOrchestrator  concurrent, retrying   [deadline check]
//!                     └─▶ Extractor          map phase              [deadline check]
//!                           └─▶ Reducer ──▶ Validator
//!                                 └─ Ok  → Document
//!                                 └─ Err → re-reduce, up to max_validation_retries
//! ```
//!
//! One deadline covers the whole run. After each external phase the runner
//! checks how many chunks actually completed: a partially degraded run
//! continues (the document records which chunks degraded), but when fewer
//! than `min_completed_ratio` of the chunks made it, the run fails with
//! [`PipelineError::DeadlineExceeded`].

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::time::Instant;

use crate::chunk::{chunk_segments, Chunk};
use crate::config::{ConfigError, PipelineConfig};
use crate::document::{Document, ValidationError, Validator};
use crate::ingest::{self, total_duration, ParseError};
use crate::services::{Generator, HttpGenerator, HttpTranslator, RetryPolicy, Translator};
use crate::summarize::{Extractor, PromptBuilder, Reducer, SummarizeError};
use crate::translate::{
    split_segment_texts, TranslatedChunk, TranslationOrchestrator, SEGMENT_SEPARATOR,
};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Everything that can end a run without a document.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The caption input could not be parsed.
    #[error("input error: {0}")]
    Parse(#[from] ParseError),

    /// The configuration failed validation at construction.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Extraction produced nothing to build a document from.
    #[error("summarization error: {0}")]
    Summarize(#[from] SummarizeError),

    /// The document still violated a structural rule after all reducer
    /// retries.
    #[error("document validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Too few chunks completed before the run deadline.
    #[error("run deadline exceeded: only {completed} of {total} chunks completed")]
    DeadlineExceeded { completed: usize, total: usize },
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Owns the validated configuration and the two external service handles.
///
/// Construct once, then call [`run`](Self::run) per transcript. Service
/// handles are trait objects so tests and alternative providers can swap
/// them in.
pub struct Pipeline {
    config: PipelineConfig,
    translator: Arc<dyn Translator>,
    generator: Arc<dyn Generator>,
}

impl Pipeline {
    /// Create a pipeline over explicit service handles.
    ///
    /// Fails fast when the configuration is invalid — a run never starts
    /// with out-of-range tunables.
    pub fn new(
        config: PipelineConfig,
        translator: Arc<dyn Translator>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            translator,
            generator,
        })
    }

    /// Create a pipeline with HTTP-backed services built from the config.
    pub fn from_config(config: PipelineConfig) -> Result<Self, ConfigError> {
        let translator = Arc::new(HttpTranslator::from_config(&config.translator));
        let generator = Arc::new(HttpGenerator::from_config(&config.generator));
        Self::new(config, translator, generator)
    }

    /// Run the full pipeline over raw caption input.
    ///
    /// Returns the validated [`Document`]; degraded content is recorded in
    /// its metadata rather than reported as an error.
    pub async fn run(
        &self,
        raw_input: &str,
        meeting_date: NaiveDate,
    ) -> Result<Document, PipelineError> {
        let segments = ingest::parse(raw_input)?;
        let meeting_duration = total_duration(&segments);
        log::info!(
            "pipeline: {} segments, {:?} of audio",
            segments.len(),
            meeting_duration
        );

        let chunks = chunk_segments(segments, self.config.max_tokens_per_chunk)?;
        let total = chunks.len();
        log::info!("pipeline: {total} chunks at ≤{} tokens", self.config.max_tokens_per_chunk);

        let deadline = Instant::now() + self.config.pipeline_deadline();
        let policy = RetryPolicy::from_config(&self.config.retry);
        let prompts = PromptBuilder::new(&self.config.target_language);

        // Translation phase.
        let orchestrator = TranslationOrchestrator::new(
            Arc::clone(&self.translator),
            policy.clone(),
            self.config.worker_pool_size,
        );
        let translation = orchestrator
            .translate_all(&chunks, &self.config.target_language, deadline)
            .await;
        self.check_deadline(total - translation.abandoned, total)?;

        let transcript = build_transcript(&chunks, &translation.chunks);
        let degraded_translation: Vec<usize> = translation
            .chunks
            .iter()
            .filter(|c| c.degraded)
            .map(|c| c.index)
            .collect();

        // Extraction map phase.
        let extractor = Extractor::new(
            Arc::clone(&self.generator),
            policy.clone(),
            prompts.clone(),
            self.config.worker_pool_size,
        );
        let extraction = extractor.extract_all(&translation.chunks, deadline).await;
        self.check_deadline(total - extraction.abandoned, total)?;

        // Reduce + validate, with bounded regeneration on validation failure.
        let reducer = Reducer::new(
            Arc::clone(&self.generator),
            policy,
            prompts,
            self.config.summary_token_ceiling,
            self.config.max_reduce_passes as usize,
        );
        let validator = Validator::from_config(&self.config);

        let mut retries = 0u32;
        loop {
            let mut document = reducer
                .reduce(
                    &extraction.partials,
                    meeting_date,
                    transcript.clone(),
                    meeting_duration,
                )
                .await?;
            document.metadata.degraded_translation_chunks = degraded_translation.clone();

            match validator.validate(&document) {
                Ok(()) => {
                    if document.metadata.is_degraded() {
                        log::warn!("pipeline: document is degraded: {:?}", document.metadata);
                    }
                    return Ok(document);
                }
                Err(err) if retries < self.config.max_validation_retries => {
                    retries += 1;
                    log::warn!(
                        "pipeline: validation failed ({err}), regenerating (retry {retries}/{})",
                        self.config.max_validation_retries
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Enforce the minimum completion ratio after a deadline-bounded phase.
    fn check_deadline(&self, completed: usize, total: usize) -> Result<(), PipelineError> {
        let required = self.config.min_completed_ratio * total as f64;
        if (completed as f64) < required {
            return Err(PipelineError::DeadlineExceeded { completed, total });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transcript assembly
// ---------------------------------------------------------------------------

/// Rebuild the timestamped transcript from translated chunk texts.
///
/// Segment boundaries are restored by splitting on the separator token.
/// When a translation mangled the separators (part count no longer matches
/// the chunk's segment count), the whole chunk becomes one line under its
/// first segment's timestamp — content is kept even when alignment is lost.
fn build_transcript(chunks: &[Chunk], translated: &[TranslatedChunk]) -> String {
    let mut lines = Vec::new();

    for (chunk, t) in chunks.iter().zip(translated) {
        let parts = split_segment_texts(&t.text);
        if parts.len() == chunk.segments.len() {
            for (segment, text) in chunk.segments.iter().zip(parts) {
                lines.push(format!("[{}] {text}", segment.start_label()));
            }
        } else {
            log::warn!(
                "pipeline: chunk {} lost segment boundaries in translation ({} parts for {} segments)",
                chunk.index,
                parts.len(),
                chunk.segments.len()
            );
            let flat: String = t
                .text
                .replace(SEGMENT_SEPARATOR, " ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if let Some(first) = chunk.segments.first() {
                lines.push(format!("[{}] {flat}", first.start_label()));
            }
        }
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
