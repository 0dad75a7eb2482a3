//! Translation orchestrator — concurrent, retrying, order-restoring.
//!
//! Each chunk's segment texts are joined (single spaces around a stable
//! separator token so segment boundaries can be restored later) and sent to
//! the external [`Translator`]. Transient failures are retried with backoff;
//! exhausted retries fall back to the untranslated source text with
//! `degraded = true` — content is never dropped because one external call
//! failed. Chunks are translated concurrently on a bounded worker pool, but
//! callers always receive results in ascending index order.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::chunk::Chunk;
use crate::services::{RetryPolicy, Translator};

// ---------------------------------------------------------------------------
// Segment separator
// ---------------------------------------------------------------------------

/// Separator token placed between segment texts inside a chunk's source
/// string. U+2063 (INVISIBLE SEPARATOR) survives translation APIs unchanged
/// and never occurs in caption text.
pub const SEGMENT_SEPARATOR: char = '\u{2063}';

/// Join a chunk's segment texts into the single string sent to the
/// translation service.
pub fn join_segment_texts(chunk: &Chunk) -> String {
    let texts: Vec<&str> = chunk.segments.iter().map(|s| s.text.as_str()).collect();
    texts.join(&format!(" {SEGMENT_SEPARATOR} "))
}

/// Split a (possibly translated) chunk string back into per-segment texts.
pub fn split_segment_texts(text: &str) -> Vec<String> {
    text.split(SEGMENT_SEPARATOR)
        .map(|part| part.trim().to_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// TranslatedChunk
// ---------------------------------------------------------------------------

/// A chunk after the translation phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedChunk {
    /// Index of the source [`Chunk`].
    pub index: usize,
    /// Translated text, or the original source text when `degraded`.
    pub text: String,
    /// `true` when translation fell back to source-language text.
    pub degraded: bool,
}

/// Result of [`TranslationOrchestrator::translate_all`]: the index-ordered
/// chunks plus how many were abandoned at the run deadline (abandoned chunks
/// are degraded and count as not-completed for the deadline threshold).
#[derive(Debug)]
pub struct TranslationOutcome {
    pub chunks: Vec<TranslatedChunk>,
    pub abandoned: usize,
}

// ---------------------------------------------------------------------------
// TranslationOrchestrator
// ---------------------------------------------------------------------------

/// Drives concurrent per-chunk translation with retry and fallback.
pub struct TranslationOrchestrator {
    translator: Arc<dyn Translator>,
    policy: RetryPolicy,
    workers: usize,
}

impl TranslationOrchestrator {
    /// Create an orchestrator over `translator` with a bounded worker pool.
    pub fn new(translator: Arc<dyn Translator>, policy: RetryPolicy, workers: usize) -> Self {
        Self {
            translator,
            policy,
            workers: workers.max(1),
        }
    }

    /// Translate all chunks into `target_language`, abandoning calls still
    /// in flight at `deadline`. Results are re-ordered by ascending index
    /// before returning; completion order is never observable.
    pub async fn translate_all(
        &self,
        chunks: &[Chunk],
        target_language: &str,
        deadline: Instant,
    ) -> TranslationOutcome {
        let pool = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(chunks.len());
        let mut source_texts = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let source_text = join_segment_texts(chunk);
            source_texts.push(source_text.clone());

            let translator = Arc::clone(&self.translator);
            let policy = self.policy.clone();
            let pool = Arc::clone(&pool);
            let target = target_language.to_owned();
            let index = chunk.index;

            handles.push(tokio::spawn(async move {
                let _permit = pool.acquire_owned().await.expect("worker pool closed");

                let attempt = tokio::time::timeout_at(
                    deadline,
                    policy.run(|| translator.translate(&source_text, &target)),
                )
                .await;

                match attempt {
                    Ok(Ok(text)) => (index, TranslatedChunk { index, text, degraded: false }, false),
                    Ok(Err(err)) => {
                        log::warn!("translate: chunk {index} fell back to source text ({err})");
                        (
                            index,
                            TranslatedChunk { index, text: source_text, degraded: true },
                            false,
                        )
                    }
                    Err(_) => {
                        log::warn!("translate: chunk {index} abandoned at run deadline");
                        (
                            index,
                            TranslatedChunk { index, text: source_text, degraded: true },
                            true,
                        )
                    }
                }
            }));
        }

        let mut translated = Vec::with_capacity(chunks.len());
        let mut abandoned = 0usize;
        for ((handle, source_text), source_chunk) in
            handles.into_iter().zip(source_texts).zip(chunks)
        {
            match handle.await {
                Ok((index, chunk, hit_deadline)) => {
                    if hit_deadline {
                        abandoned += 1;
                    }
                    translated.push((index, chunk));
                }
                Err(join_err) => {
                    // A panicked task degrades its chunk; the run continues.
                    log::error!("translate: worker task failed: {join_err}");
                    let index = source_chunk.index;
                    translated.push((
                        index,
                        TranslatedChunk { index, text: source_text, degraded: true },
                    ));
                }
            }
        }

        translated.sort_by_key(|(index, _)| *index);
        let chunks: Vec<TranslatedChunk> =
            translated.into_iter().map(|(_, chunk)| chunk).collect();

        let degraded = chunks.iter().filter(|c| c.degraded).count();
        log::debug!(
            "translate: {} chunks done, {degraded} degraded, {abandoned} abandoned",
            chunks.len()
        );
        TranslationOutcome { chunks, abandoned }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Segment;
    use crate::services::ServiceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Uppercases input after a per-chunk latency chosen so that later
    /// chunks complete first.
    struct SlowUppercase;

    #[async_trait]
    impl Translator for SlowUppercase {
        async fn translate(&self, text: &str, _lang: &str) -> Result<String, ServiceError> {
            // "chunk 0 …" sleeps longest; reverse completion order.
            let index: u64 = text
                .split_whitespace()
                .nth(1)
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(40u64.saturating_sub(index * 5))).await;
            Ok(text.to_uppercase())
        }
    }

    /// Fails permanently for one chunk index, succeeds for the rest.
    struct FailOne {
        needle: String,
    }

    #[async_trait]
    impl Translator for FailOne {
        async fn translate(&self, text: &str, _lang: &str) -> Result<String, ServiceError> {
            if text.contains(&self.needle) {
                Err(ServiceError::Permanent("rejected".into()))
            } else {
                Ok(text.to_uppercase())
            }
        }
    }

    /// Fails transiently a fixed number of times before succeeding.
    struct FlakyTranslator {
        failures: AtomicU32,
    }

    #[async_trait]
    impl Translator for FlakyTranslator {
        async fn translate(&self, text: &str, _lang: &str) -> Result<String, ServiceError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                Err(ServiceError::Transient("timeout".into()))
            } else {
                Ok(text.to_uppercase())
            }
        }
    }

    /// Never completes within any reasonable deadline.
    struct StuckTranslator;

    #[async_trait]
    impl Translator for StuckTranslator {
        async fn translate(&self, _text: &str, _lang: &str) -> Result<String, ServiceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn chunk(index: usize, texts: &[&str]) -> Chunk {
        let segments = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Segment {
                start: Duration::from_secs(i as u64 * 5),
                end: Duration::from_secs(i as u64 * 5 + 5),
                text: (*text).to_owned(),
            })
            .collect();
        Chunk {
            index,
            segments,
            estimated_tokens: 1,
        }
    }

    fn chunks(n: usize) -> Vec<Chunk> {
        (0..n)
            .map(|i| chunk(i, &[&format!("chunk {i} first part"), "and second part"]))
            .collect()
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(30)
    }

    // -----------------------------------------------------------------------
    // Separator round trip
    // -----------------------------------------------------------------------

    #[test]
    fn separator_round_trip_restores_segment_texts() {
        let c = chunk(0, &["first segment", "second segment", "third"]);
        let joined = join_segment_texts(&c);
        let restored = split_segment_texts(&joined);

        assert_eq!(restored, vec!["first segment", "second segment", "third"]);
    }

    #[test]
    fn joined_text_uses_single_spaces_around_separator() {
        let c = chunk(0, &["a", "b"]);
        assert_eq!(join_segment_texts(&c), format!("a {SEGMENT_SEPARATOR} b"));
    }

    // -----------------------------------------------------------------------
    // Ordering and fallback
    // -----------------------------------------------------------------------

    /// Results must be index-ordered even when chunks complete in reverse.
    #[tokio::test]
    async fn output_is_index_ordered_regardless_of_completion_order() {
        let orchestrator =
            TranslationOrchestrator::new(Arc::new(SlowUppercase), fast_policy(), 8);
        let input = chunks(6);

        let outcome = orchestrator
            .translate_all(&input, "pt", far_deadline())
            .await;

        assert_eq!(outcome.chunks.len(), 6);
        assert_eq!(outcome.abandoned, 0);
        for (i, translated) in outcome.chunks.iter().enumerate() {
            assert_eq!(translated.index, i);
            assert!(translated.text.contains(&format!("CHUNK {i}")));
            assert!(!translated.degraded);
        }
    }

    /// A permanently failing chunk keeps its source text, flagged degraded.
    #[tokio::test]
    async fn permanent_failure_falls_back_to_source_text() {
        let orchestrator = TranslationOrchestrator::new(
            Arc::new(FailOne {
                needle: "chunk 1".into(),
            }),
            fast_policy(),
            4,
        );
        let input = chunks(3);
        let expected_source = join_segment_texts(&input[1]);

        let outcome = orchestrator
            .translate_all(&input, "pt", far_deadline())
            .await;

        assert!(!outcome.chunks[0].degraded);
        assert!(outcome.chunks[1].degraded);
        assert!(!outcome.chunks[2].degraded);
        assert!(!outcome.chunks[1].text.is_empty());
        assert_eq!(outcome.chunks[1].text, expected_source);
    }

    /// Two transient failures then success: chunk ends up non-degraded.
    #[tokio::test]
    async fn transient_failures_are_retried_to_success() {
        let orchestrator = TranslationOrchestrator::new(
            Arc::new(FlakyTranslator {
                failures: AtomicU32::new(2),
            }),
            fast_policy(),
            1,
        );
        let input = chunks(1);

        let outcome = orchestrator
            .translate_all(&input, "pt", far_deadline())
            .await;

        assert_eq!(outcome.chunks.len(), 1);
        assert!(!outcome.chunks[0].degraded);
        assert!(outcome.chunks[0].text.contains("CHUNK 0"));
    }

    /// Chunks still in flight at the deadline are abandoned but kept, with
    /// their source text and the degraded flag.
    #[tokio::test]
    async fn deadline_abandons_in_flight_chunks_without_dropping_them() {
        let orchestrator =
            TranslationOrchestrator::new(Arc::new(StuckTranslator), fast_policy(), 4);
        let input = chunks(3);
        let deadline = Instant::now() + Duration::from_millis(20);

        let outcome = orchestrator.translate_all(&input, "pt", deadline).await;

        assert_eq!(outcome.chunks.len(), 3);
        assert_eq!(outcome.abandoned, 3);
        for (i, translated) in outcome.chunks.iter().enumerate() {
            assert!(translated.degraded);
            assert_eq!(translated.text, join_segment_texts(&input[i]));
        }
    }
}
