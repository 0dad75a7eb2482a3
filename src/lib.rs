//! acta — timed-caption transcripts in, validated meeting minutes out.
//!
//! The pipeline parses WebVTT-style captions, groups segments into
//! token-bounded chunks, translates them concurrently through an external
//! service, runs a map-reduce extraction over the translated text, and
//! validates the resulting four-section Markdown document before hand-off.
//!
//! ```rust,no_run
//! use acta::config::PipelineConfig;
//! use acta::pipeline::Pipeline;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pipeline = Pipeline::from_config(PipelineConfig::default())?;
//! let captions = std::fs::read_to_string("meeting.vtt")?;
//! let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
//!
//! let document = pipeline.run(&captions, date).await?;
//! println!("{}", document.render());
//! # Ok(())
//! # }
//! ```

pub mod chunk;
pub mod config;
pub mod document;
pub mod ingest;
pub mod pipeline;
pub mod services;
pub mod summarize;
pub mod translate;

// ---------------------------------------------------------------------------
// Top-level re-exports
// ---------------------------------------------------------------------------

pub use config::PipelineConfig;
pub use document::Document;
pub use pipeline::{Pipeline, PipelineError};
