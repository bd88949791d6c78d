use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{json, Value};

use super::{
    error::ProviderError,
    provider::{CompletionProvider, GenerationRequest},
};

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
const ERROR_BODY_LIMIT: usize = 320;

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Google Generative Language `generateContent` backend.
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ProviderError::Transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { client, config })
    }

    fn endpoint_url(&self) -> Result<Url, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("gemini backend requires api_key".into()))?;

        resolve_endpoint(&self.config.endpoint, &self.config.model, api_key)
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Value, ProviderError> {
        let url = self.endpoint_url()?;
        let payload = build_payload(&request);

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status,
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| ProviderError::InvalidEnvelope(format!("invalid gemini response: {err}")))?;

        let text = candidate_text(&body)?;
        Ok(serde_json::from_str(strip_code_fence(&text)).unwrap_or(Value::String(text)))
    }
}

fn build_payload(request: &GenerationRequest) -> Value {
    json!({
        "contents": [
            {
                "role": "user",
                "parts": [
                    { "text": request.instruction },
                    {
                        "inlineData": {
                            "mimeType": request.image.mime_type,
                            "data": request.image.data_base64,
                        }
                    }
                ]
            }
        ],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        }
    })
}

fn candidate_text(body: &Value) -> Result<String, ProviderError> {
    let candidate = body["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .ok_or_else(|| {
            let reason = body["promptFeedback"]["blockReason"]
                .as_str()
                .map(|reason| format!("no candidates (blocked: {reason})"))
                .unwrap_or_else(|| "no candidates".to_string());
            ProviderError::InvalidEnvelope(reason)
        })?;

    let parts = candidate["content"]["parts"].as_array().ok_or_else(|| {
        let finish = candidate["finishReason"].as_str().unwrap_or("unknown");
        ProviderError::InvalidEnvelope(format!("candidate has no content (finish reason {finish})"))
    })?;

    Ok(parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}

/// Models occasionally wrap JSON in a markdown fence despite the mime type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn resolve_endpoint(endpoint: &str, model: &str, api_key: &str) -> Result<Url, ProviderError> {
    let mut url = if endpoint.contains(":generateContent") {
        Url::parse(endpoint)
            .map_err(|e| ProviderError::NotConfigured(format!("invalid gemini endpoint {endpoint}: {e}")))?
    } else {
        let base = endpoint.trim_end_matches('/');
        let generated = format!("{base}/v1beta/models/{model}:generateContent");
        Url::parse(&generated)
            .map_err(|e| ProviderError::NotConfigured(format!("invalid gemini endpoint {generated}: {e}")))?
    };

    if !url.query_pairs().any(|(k, _)| k == "key") {
        url.query_pairs_mut().append_pair("key", api_key);
    }

    Ok(url)
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        // Strip the URL so the api key never lands in logs.
        ProviderError::Transport(err.without_url().to_string())
    }
}

fn truncate(body: &str, limit: usize) -> String {
    if body.chars().count() <= limit {
        return body.to_string();
    }
    let mut out: String = body.chars().take(limit).collect();
    out.push_str("...");
    out
}
