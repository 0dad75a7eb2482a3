//! Pipeline configuration structs, defaults, validation and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Credentials and endpoints live here as explicit fields passed into each
//! component at construction — nothing reads ambient state.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Raised by [`PipelineConfig::validate`] when a tunable is out of range.
///
/// Configuration errors are fatal for the run — no retry, no fallback.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value that must be strictly positive was zero.
    #[error("`{field}` must be greater than zero")]
    NonPositive { field: &'static str },

    /// A ratio/threshold field was outside `0.0..=1.0`.
    #[error("`{field}` must be within 0.0..=1.0 (got {value})")]
    RatioOutOfRange { field: &'static str, value: f64 },

    /// A required string field was empty.
    #[error("`{field}` must not be empty")]
    Empty { field: &'static str },
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

/// Retry-with-backoff settings shared by the translation orchestrator and
/// the extraction map phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per external call (first try included).
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay_ms: u64,
    /// Cap applied to the doubled delay.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

// ---------------------------------------------------------------------------
// TranslatorConfig
// ---------------------------------------------------------------------------

/// Connection settings for the external translation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Base URL of the translate REST endpoint.
    pub endpoint: String,
    /// Subscription key — `None` for keyless test deployments.
    pub api_key: Option<String>,
    /// Service region header value, when the provider requires one.
    pub region: Option<String>,
    /// Maximum seconds to wait for a single translate call.
    pub timeout_secs: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.cognitive.microsofttranslator.com".into(),
            api_key: None,
            region: None,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// GeneratorConfig
// ---------------------------------------------------------------------------

/// Connection settings for the generative extraction service.
///
/// Any OpenAI-compatible `/v1/chat/completions` endpoint works — a hosted
/// deployment or a local server in OpenAI mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL of the API endpoint.
    pub base_url: String,
    /// API key — `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier sent to the API.
    pub model: String,
    /// Sampling temperature (0.0 – 1.0). Lower = more deterministic.
    pub temperature: f32,
    /// Maximum seconds to wait for a generation response.
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "gpt-4o".into(),
            temperature: 0.3,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level pipeline configuration, serialised as `acta.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use acta::config::PipelineConfig;
///
/// let config = PipelineConfig::load_from("acta.toml".as_ref()).unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Upper bound on the estimated token count of a chunk.
    pub max_tokens_per_chunk: usize,
    /// ISO-639-1 code of the language the document must be written in.
    pub target_language: String,
    /// Maximum estimated token count of the executive summary (~150 words).
    pub summary_token_ceiling: usize,
    /// Minimum fraction of document tokens identified as `target_language`.
    pub language_purity_threshold: f64,
    /// Retry/backoff policy for external service calls.
    pub retry: RetryConfig,
    /// Concurrent in-flight external calls per phase.
    pub worker_pool_size: usize,
    /// Whole-run deadline in seconds; in-flight calls are abandoned after it.
    pub pipeline_deadline_secs: u64,
    /// Minimum fraction of chunks that must complete before the deadline for
    /// the run to proceed with degraded output instead of failing.
    pub min_completed_ratio: f64,
    /// Maximum "reduce of reduces" compression passes over the summary.
    pub max_reduce_passes: u32,
    /// Reducer re-runs allowed after a validation failure.
    pub max_validation_retries: u32,
    /// Translation service connection settings.
    pub translator: TranslatorConfig,
    /// Generation service connection settings.
    pub generator: GeneratorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: 7_500,
            target_language: "pt".into(),
            summary_token_ceiling: 200,
            language_purity_threshold: 0.95,
            retry: RetryConfig::default(),
            worker_pool_size: 4,
            pipeline_deadline_secs: 300,
            min_completed_ratio: 0.5,
            max_reduce_passes: 2,
            max_validation_retries: 2,
            translator: TranslatorConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Check every tunable at startup; the pipeline refuses to construct
    /// itself from an invalid configuration.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.max_tokens_per_chunk == 0 {
            return Err(ConfigError::NonPositive {
                field: "max_tokens_per_chunk",
            });
        }
        if self.target_language.trim().is_empty() {
            return Err(ConfigError::Empty {
                field: "target_language",
            });
        }
        if self.summary_token_ceiling == 0 {
            return Err(ConfigError::NonPositive {
                field: "summary_token_ceiling",
            });
        }
        if !(0.0..=1.0).contains(&self.language_purity_threshold) {
            return Err(ConfigError::RatioOutOfRange {
                field: "language_purity_threshold",
                value: self.language_purity_threshold,
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::NonPositive {
                field: "retry.max_attempts",
            });
        }
        if self.worker_pool_size == 0 {
            return Err(ConfigError::NonPositive {
                field: "worker_pool_size",
            });
        }
        if self.pipeline_deadline_secs == 0 {
            return Err(ConfigError::NonPositive {
                field: "pipeline_deadline_secs",
            });
        }
        if !(0.0..=1.0).contains(&self.min_completed_ratio) {
            return Err(ConfigError::RatioOutOfRange {
                field: "min_completed_ratio",
                value: self.min_completed_ratio,
            });
        }
        Ok(())
    }

    /// Whole-run deadline as a [`Duration`].
    pub fn pipeline_deadline(&self) -> Duration {
        Duration::from_secs(self.pipeline_deadline_secs)
    }

    /// Load from an explicit path. The file must exist; unlike first-run
    /// desktop settings, a missing pipeline config is a deployment error.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
