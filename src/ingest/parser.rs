//! Timed-caption parser — converts a WebVTT-style block stream into an
//! ordered [`Segment`] sequence.
//!
//! Input shape: an optional `WEBVTT` header, then blank-line-separated cue
//! blocks. Each cue block holds an optional identifier line, a timing line
//! (`start --> end`), and one or more text lines. `NOTE`/`STYLE`/`REGION`
//! blocks are skipped. No reordering occurs; segments are yielded in source
//! order.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::segment::{parse_offset, Segment};

// ---------------------------------------------------------------------------
// ParseError
// ---------------------------------------------------------------------------

/// Malformed caption input. Fatal for the run — no retry.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input contained no cue blocks at all.
    #[error("caption input is empty")]
    EmptyInput,

    /// A cue block had no `start --> end` timing line.
    #[error("cue block {block} lacks a start/end timing line")]
    MissingTiming { block: usize },

    /// A timing value could not be parsed.
    #[error("cue block {block} has a malformed timing value `{value}`")]
    BadTiming { block: usize, value: String },

    /// A cue's start offset was after its end offset.
    #[error("cue block {block} starts after it ends")]
    StartAfterEnd { block: usize },
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

/// Inline caption markup (`<v Speaker>`, `<i>`, `<00:00:01.000>` …).
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Parse raw caption input into an ordered segment sequence.
///
/// Whitespace within each cue's text is normalized: tags stripped, newlines
/// collapsed to single spaces, leading/trailing whitespace trimmed. Cues
/// whose text normalizes to the empty string are kept — dropping them would
/// break the chunk round-trip guarantee for callers that count cues.
pub fn parse(raw_input: &str) -> Result<Vec<Segment>, ParseError> {
    let mut segments = Vec::new();
    let mut block_no = 0usize;

    // CRLF files are common; normalize so blank-line block splitting works.
    let normalized = raw_input.replace("\r\n", "\n");

    for block in normalized.split("\n\n").map(str::trim) {
        if block.is_empty() {
            continue;
        }
        // Header and non-cue metadata blocks.
        let first = block.lines().next().unwrap_or_default();
        if first.starts_with("WEBVTT")
            || first.starts_with("NOTE")
            || first.starts_with("STYLE")
            || first.starts_with("REGION")
        {
            continue;
        }
        block_no += 1;

        let mut lines = block.lines().peekable();
        // Optional cue identifier line before the timing line.
        let timing_line = loop {
            match lines.next() {
                Some(line) if line.contains("-->") => break line,
                Some(line) if lines.peek().is_some() && !line.contains("-->") => continue,
                _ => return Err(ParseError::MissingTiming { block: block_no }),
            }
        };

        let (start_raw, end_raw) = timing_line
            .split_once("-->")
            .ok_or(ParseError::MissingTiming { block: block_no })?;
        // Cue settings (position, align …) may trail the end timestamp.
        let end_raw = end_raw.trim().split_whitespace().next().unwrap_or_default();

        let start = parse_offset(start_raw).ok_or_else(|| ParseError::BadTiming {
            block: block_no,
            value: start_raw.trim().to_owned(),
        })?;
        let end = parse_offset(end_raw).ok_or_else(|| ParseError::BadTiming {
            block: block_no,
            value: end_raw.to_owned(),
        })?;
        if start > end {
            return Err(ParseError::StartAfterEnd { block: block_no });
        }

        let text = normalize_text(&lines.collect::<Vec<_>>().join(" "));
        segments.push(Segment { start, end, text });
    }

    if segments.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    log::debug!("ingest: parsed {} segments", segments.len());
    Ok(segments)
}

/// Strip inline markup and collapse all whitespace runs to single spaces.
fn normalize_text(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const SAMPLE: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:05.000\nHello world\n\n00:00:06.000 --> 00:00:10.000\nThis is\na test\n";

    #[test]
    fn parses_basic_cues_in_order() {
        let segments = parse(SAMPLE).expect("valid input");

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, Duration::from_secs(1));
        assert_eq!(segments[0].end, Duration::from_secs(5));
        assert_eq!(segments[0].text, "Hello world");
        assert_eq!(segments[1].text, "This is a test");
    }

    #[test]
    fn accepts_crlf_line_endings() {
        let input = "WEBVTT\r\n\r\n00:00:01.000 --> 00:00:05.000\r\nOlá a todos.\r\n\r\n00:00:06.000 --> 00:00:10.000\r\nVamos começar.\r\n";
        let segments = parse(input).expect("CRLF input is valid");

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Olá a todos.");
        assert_eq!(segments[1].text, "Vamos começar.");
    }

    #[test]
    fn multiline_text_collapses_to_single_spaces() {
        let input = "00:00:00.000 --> 00:00:02.000\n  line one  \nline two\n";
        let segments = parse(input).expect("valid");
        assert_eq!(segments[0].text, "line one line two");
    }

    #[test]
    fn strips_inline_tags() {
        let input = "00:00:00.000 --> 00:00:02.000\n<v Alice>Hello <i>there</i>\n";
        let segments = parse(input).expect("valid");
        assert_eq!(segments[0].text, "Hello there");
    }

    #[test]
    fn skips_cue_identifier_lines() {
        let input = "WEBVTT\n\nintro-cue-1\n00:00:00.000 --> 00:00:02.000\nHello\n";
        let segments = parse(input).expect("valid");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Hello");
    }

    #[test]
    fn skips_note_and_style_blocks() {
        let input = "WEBVTT\n\nNOTE internal comment\n\nSTYLE\n::cue { color: red }\n\n00:00:00.000 --> 00:00:01.000\nHi\n";
        let segments = parse(input).expect("valid");
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn ignores_trailing_cue_settings() {
        let input = "00:00:00.000 --> 00:00:02.000 position:50% align:middle\nHello\n";
        let segments = parse(input).expect("valid");
        assert_eq!(segments[0].end, Duration::from_secs(2));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(parse(""), Err(ParseError::EmptyInput)));
        assert!(matches!(parse("WEBVTT\n"), Err(ParseError::EmptyInput)));
    }

    #[test]
    fn block_without_timing_line_is_rejected() {
        let input = "WEBVTT\n\njust some text\nno timing here\n";
        let err = parse(input).expect_err("must fail");
        assert!(matches!(err, ParseError::MissingTiming { block: 1 }));
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let input = "00:00:xx.000 --> 00:00:02.000\nHello\n";
        let err = parse(input).expect_err("must fail");
        assert!(matches!(err, ParseError::BadTiming { block: 1, .. }));
    }

    #[test]
    fn start_after_end_is_rejected() {
        let input = "00:00:05.000 --> 00:00:02.000\nHello\n";
        let err = parse(input).expect_err("must fail");
        assert!(matches!(err, ParseError::StartAfterEnd { block: 1 }));
    }

    #[test]
    fn start_equal_to_end_is_accepted() {
        let input = "00:00:02.000 --> 00:00:02.000\nMarker\n";
        let segments = parse(input).expect("valid");
        assert_eq!(segments[0].start, segments[0].end);
    }
}
