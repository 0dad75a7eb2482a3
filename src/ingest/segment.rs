//! The [`Segment`] model — a single timed caption unit.
//!
//! Segments are immutable once parsed and their sequence order is
//! significant: every downstream stage must preserve it exactly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// One timed caption unit: start/end offsets into the recording plus the
/// normalized caption text.
///
/// Invariant (enforced by the parser): `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Offset of the first spoken word from the start of the recording.
    pub start: Duration,
    /// Offset of the last spoken word.
    pub end: Duration,
    /// Caption text with tags stripped and whitespace collapsed.
    pub text: String,
}

impl Segment {
    /// Length of the segment.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The start offset rendered as `HH:MM:SS`, used to prefix transcript
    /// lines in the final document.
    pub fn start_label(&self) -> String {
        format_offset(self.start)
    }
}

/// Total span of an ordered segment sequence (end of the last segment).
///
/// Returns `Duration::ZERO` for an empty sequence.
pub fn total_duration(segments: &[Segment]) -> Duration {
    segments.last().map(|s| s.end).unwrap_or(Duration::ZERO)
}

// ---------------------------------------------------------------------------
// Offset formatting / parsing
// ---------------------------------------------------------------------------

/// Render a duration offset as `HH:MM:SS`.
pub fn format_offset(offset: Duration) -> String {
    let total = offset.as_secs();
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Parse a caption timing value (`HH:MM:SS.mmm` or `MM:SS.mmm`, comma
/// accepted as the decimal mark) into a [`Duration`].
///
/// Returns `None` on any malformed component.
pub(crate) fn parse_offset(value: &str) -> Option<Duration> {
    let normalized = value.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();

    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0, m.parse::<u64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    if !(0.0..60.0).contains(&seconds) || minutes >= 60 {
        return None;
    }

    let whole = hours * 3600 + minutes * 60;
    Some(Duration::from_secs(whole) + Duration::from_secs_f64(seconds))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
