//! Map-reduce summarization over translated chunks.
//!
//! The map phase ([`Extractor`]) sends each translated chunk to the
//! generative service and parses the response into a [`PartialResult`].
//! The reduce phase ([`Reducer`]) merges partials chronologically into a
//! [`Document`](crate::document::Document) and keeps the executive summary
//! under its token ceiling. [`PromptBuilder`] owns the prompt text for
//! both phases.

pub mod extract;
pub mod prompt;
pub mod reduce;

pub use extract::{parse_extraction, ExtractionOutcome, Extractor, PartialResult};
pub use prompt::PromptBuilder;
pub use reduce::{Reducer, SummarizeError};
