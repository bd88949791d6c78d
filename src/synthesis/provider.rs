use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::error::ProviderError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    /// Standard base64, no data-URI header.
    pub data_base64: String,
}

/// One generation round trip: instruction text, the photo, and the schema
/// the provider is asked to honour.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub instruction: String,
    pub image: InlineImage,
    pub response_schema: Value,
}

/// A generative-AI backend that can answer with a structured object.
///
/// Implementations report only transport and envelope failures. Whatever the
/// model produced is handed back as-is for the caller to validate.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerationRequest) -> Result<Value, ProviderError>;
}
