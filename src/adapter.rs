use crate::config::AnalyzerConfig;
use crate::error::AdapterError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const MESSAGES_PATH: &str = "/v1/messages";

/// A vision model that turns an image plus an instruction into text.
///
/// Implementations make exactly one outbound call per invocation and never
/// retry; the orchestrator decides what a failure means.
#[async_trait]
pub trait VisionAdapter: Send + Sync {
    /// Send a base64 JPEG and a prompt, returning the model's raw text.
    async fn analyze(&self, image_b64: &str, prompt: &str) -> Result<String, AdapterError>;

    /// Identifier used in logs.
    fn model_name(&self) -> &str;
}

/// [`VisionAdapter`] for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    timeout: Duration,
}

impl AnthropicAdapter {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self::with_http_client(Client::new(), config)
    }

    /// Reuse an existing `reqwest::Client` (connection pool, proxies).
    pub fn with_http_client(client: Client, config: &AnalyzerConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.trim().to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        }
    }

    /// Full URL of the messages endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, MESSAGES_PATH)
    }

    /// Build the request body: the image block first, then the prompt.
    pub fn request_body(&self, image_b64: &str, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": "image/jpeg",
                            "data": strip_data_url_prefix(image_b64),
                        }
                    },
                    {
                        "type": "text",
                        "text": prompt,
                    }
                ]
            }]
        })
    }
}

#[async_trait]
impl VisionAdapter for AnthropicAdapter {
    async fn analyze(&self, image_b64: &str, prompt: &str) -> Result<String, AdapterError> {
        let body = self.request_body(image_b64, prompt);
        let url = self.endpoint();
        let started = Instant::now();

        tracing::debug!(model = %self.model, url = %url, "Sending vision request");

        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AdapterError::Timeout(self.timeout)
                } else {
                    AdapterError::Connection(self.base_url.clone(), e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(AdapterError::Http { status, body: text });
        }

        let json: Value = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout(self.timeout)
            } else {
                AdapterError::InvalidResponse(e.to_string())
            }
        })?;

        let text = first_text_block(&json)?;

        tracing::info!(
            model = %self.model,
            duration_ms = started.elapsed().as_millis() as u64,
            response_len = text.len(),
            "Vision request completed"
        );

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Remove a `data:image/...;base64,` prefix if present.
pub fn strip_data_url_prefix(image_b64: &str) -> &str {
    if image_b64.starts_with("data:") {
        if let Some(idx) = image_b64.find(";base64,") {
            return &image_b64[idx + ";base64,".len()..];
        }
    }
    image_b64
}

/// Pull the first `text` block out of a Messages API response.
fn first_text_block(json: &Value) -> Result<String, AdapterError> {
    let content = json
        .get("content")
        .and_then(|v| v.as_array())
        .ok_or_else(|| AdapterError::InvalidResponse("missing content array".to_string()))?;

    content
        .iter()
        .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
        .ok_or(AdapterError::EmptyContent)
}
