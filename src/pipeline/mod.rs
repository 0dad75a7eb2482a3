//! Pipeline orchestration — one entry point over the whole flow.
//!
//! ```text
//! raw captions ──▶ parse ──▶ chunk ──▶ translate ──▶ extract ──▶ reduce ──▶ validate
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use acta::config::PipelineConfig;
//! use acta::pipeline::Pipeline;
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::load_from("acta.toml".as_ref())?;
//!     let pipeline = Pipeline::from_config(config)?;
//!
//!     let captions = std::fs::read_to_string("meeting.vtt")?;
//!     let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
//!
//!     let document = pipeline.run(&captions, date).await?;
//!     println!("{}", document.render());
//!     Ok(())
//! }
//! ```

pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{Pipeline, PipelineError};
