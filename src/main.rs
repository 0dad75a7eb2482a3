//! Command-line entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`PipelineConfig`] from `acta.toml` (or the `--config` path).
//! 3. Build the [`Pipeline`] with HTTP-backed services.
//! 4. Read the caption file, run the pipeline, print the rendered document
//!    to stdout.
//!
//! ```text
//! acta <captions.vtt> [--date YYYY-MM-DD] [--config acta.toml]
//! ```
//!
//! The meeting date defaults to today.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};

use acta::config::PipelineConfig;
use acta::pipeline::Pipeline;

struct CliArgs {
    captions: PathBuf,
    date: NaiveDate,
    config: PathBuf,
}

fn usage() -> String {
    "usage: acta <captions.vtt> [--date YYYY-MM-DD] [--config acta.toml]".into()
}

fn parse_args() -> Result<CliArgs, String> {
    let mut captions: Option<PathBuf> = None;
    let mut date = Local::now().date_naive();
    let mut config = PathBuf::from("acta.toml");

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--date" => {
                let value = args.next().ok_or_else(|| "--date needs a value".to_owned())?;
                date = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
                    .map_err(|e| format!("bad --date `{value}`: {e}"))?;
            }
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--config needs a value".to_owned())?;
                config = PathBuf::from(value);
            }
            "--help" | "-h" => return Err(usage()),
            _ if captions.is_none() => captions = Some(PathBuf::from(arg)),
            other => return Err(format!("unexpected argument `{other}`\n{}", usage())),
        }
    }

    Ok(CliArgs {
        captions: captions.ok_or_else(usage)?,
        date,
        config,
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let config = if args.config.exists() {
        match PipelineConfig::load_from(&args.config) {
            Ok(config) => config,
            Err(e) => {
                log::error!("failed to load {}: {e}", args.config.display());
                return ExitCode::FAILURE;
            }
        }
    } else {
        log::info!("{} not found, using defaults", args.config.display());
        PipelineConfig::default()
    };

    let raw_input = match std::fs::read_to_string(&args.captions) {
        Ok(content) => content,
        Err(e) => {
            log::error!("failed to read {}: {e}", args.captions.display());
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::from_config(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            log::error!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(pipeline.run(&raw_input, args.date)) {
        Ok(document) => {
            if document.metadata.is_degraded() {
                log::warn!(
                    "document carries degraded content: {:?}",
                    document.metadata
                );
            }
            println!("{}", document.render());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("pipeline failed: {e}");
            ExitCode::FAILURE
        }
    }
}
