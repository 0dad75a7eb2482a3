//! Caption ingestion — the [`Segment`] model and the timed-caption parser.
//!
//! `parse` converts raw WebVTT-style input into an ordered `Vec<Segment>`;
//! everything downstream (chunking, translation, extraction) preserves that
//! order exactly.

pub mod parser;
pub mod segment;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use parser::{parse, ParseError};
pub use segment::{format_offset, total_duration, Segment};
