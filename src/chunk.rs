//! Token-bounded, order-preserving chunking of the segment sequence.
//!
//! Token counts are estimated with a cheap fixed characters-per-token proxy;
//! exactness is not required, only monotonic consistency. Chunks partition
//! the input: concatenating them in index order reconstructs the original
//! segment sequence exactly.

use crate::config::ConfigError;
use crate::ingest::Segment;

// ---------------------------------------------------------------------------
// Token estimation
// ---------------------------------------------------------------------------

/// Fixed characters-per-token ratio used by the estimation proxy.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text` (≈4 characters per token, rounded up).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A contiguous, token-bounded slice of the segment sequence.
///
/// Created once per run and read-only afterward. `index` runs 0..N-1 in
/// source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk in the partition.
    pub index: usize,
    /// The segments of this chunk, in source order.
    pub segments: Vec<Segment>,
    /// Sum of the per-segment token estimates.
    pub estimated_tokens: usize,
}

// ---------------------------------------------------------------------------
// chunk_segments
// ---------------------------------------------------------------------------

/// Greedily group `segments` into chunks of at most `max_tokens_per_chunk`
/// estimated tokens.
///
/// A segment is never split: a single segment whose own estimate exceeds the
/// budget is placed alone in its own chunk (it carries a single timestamp
/// pair, so splitting it would corrupt the timing data).
pub fn chunk_segments(
    segments: Vec<Segment>,
    max_tokens_per_chunk: usize,
) -> Result<Vec<Chunk>, ConfigError> {
    if max_tokens_per_chunk == 0 {
        return Err(ConfigError::NonPositive {
            field: "max_tokens_per_chunk",
        });
    }

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Vec<Segment> = Vec::new();
    let mut current_tokens = 0usize;

    for segment in segments {
        let segment_tokens = estimate_tokens(&segment.text);

        if !current.is_empty() && current_tokens + segment_tokens > max_tokens_per_chunk {
            chunks.push(Chunk {
                index: chunks.len(),
                segments: std::mem::take(&mut current),
                estimated_tokens: current_tokens,
            });
            current_tokens = 0;
        }

        current.push(segment);
        current_tokens += segment_tokens;
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            index: chunks.len(),
            segments: current,
            estimated_tokens: current_tokens,
        });
    }

    log::debug!(
        "chunk: {} chunks at budget {} tokens",
        chunks.len(),
        max_tokens_per_chunk
    );
    Ok(chunks)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
