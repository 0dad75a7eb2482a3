//! HTTP-backed [`Translator`] and [`Generator`] implementations.
//!
//! [`HttpTranslator`] speaks the cognitive-services translate wire format
//! (`POST {endpoint}/translate?api-version=3.0&to={lang}` with an array
//! body). [`HttpGenerator`] calls any OpenAI-compatible
//! `/v1/chat/completions` endpoint. All connection details come from the
//! config structs; nothing is hardcoded.

use async_trait::async_trait;

use crate::config::{GeneratorConfig, TranslatorConfig};

use super::{Generator, ServiceError, Translator};

// ---------------------------------------------------------------------------
// HttpTranslator
// ---------------------------------------------------------------------------

/// Translate REST client.
pub struct HttpTranslator {
    client: reqwest::Client,
    config: TranslatorConfig,
}

impl HttpTranslator {
    /// Build a translator from connection settings. The HTTP client carries
    /// the per-request timeout from `config.timeout_secs`.
    pub fn from_config(config: &TranslatorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ServiceError> {
        let url = format!("{}/translate", self.config.endpoint);
        let body = serde_json::json!([{ "text": text }]);

        let mut req = self
            .client
            .post(&url)
            .query(&[("api-version", "3.0"), ("to", target_language)])
            .json(&body);

        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.header("Ocp-Apim-Subscription-Key", key);
        }
        if let Some(region) = self.config.region.as_deref().filter(|r| !r.is_empty()) {
            req = req.header("Ocp-Apim-Subscription-Region", region);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!("translate API error {status}: {detail}");
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(ServiceError::Transient(message))
            } else {
                Err(ServiceError::Permanent(message))
            };
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Permanent(format!("unparseable translate response: {e}")))?;

        payload[0]["translations"][0]["text"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| {
                ServiceError::Permanent("translate response carried no translation".into())
            })
    }
}

// ---------------------------------------------------------------------------
// HttpGenerator
// ---------------------------------------------------------------------------

/// Chat-completions client for the generative extraction capability.
///
/// The `Authorization: Bearer …` header is attached only when
/// `config.api_key` is a non-empty string, so local providers that require
/// no authentication work unchanged.
pub struct HttpGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl HttpGenerator {
    /// Build a generator from connection settings.
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": prompt }
            ],
            "stream": false,
            "temperature": self.config.temperature,
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!("generation API error {status}: {detail}");
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(ServiceError::Transient(message))
            } else {
                Err(ServiceError::Permanent(message))
            };
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            ServiceError::Permanent(format!("unparseable generation response: {e}"))
        })?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ServiceError::Permanent(
                "generation response carried no content".into(),
            ));
        }
        Ok(content.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
