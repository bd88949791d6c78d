use thiserror::Error;

/// Bad inbound request. Raised before any provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("image payload is empty")]
    EmptyImage,

    #[error("image payload is not a data URI")]
    NotDataUri,

    #[error("image payload is missing its media type")]
    MissingMediaType,

    #[error("image payload must be base64 encoded")]
    NotBase64Encoded,

    #[error("unsupported media type '{0}'")]
    UnsupportedMediaType(String),

    #[error("image payload is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("image bytes do not match declared media type '{declared}'")]
    MediaTypeMismatch { declared: String },

    #[error("image could not be decoded: {0}")]
    Undecodable(String),
}

/// Failure talking to the completion provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider is not configured: {0}")]
    NotConfigured(String),

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider request timed out")]
    Timeout,

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider response envelope was unusable: {0}")]
    InvalidEnvelope(String),
}

/// The provider answered, but its output broke the result contract.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("provider output is not a JSON object (got {0})")]
    NotAnObject(&'static str),

    #[error("provider output is missing field '{0}'")]
    MissingField(&'static str),

    #[error("provider output field '{field}' must be a string (got {found})")]
    WrongType {
        field: &'static str,
        found: &'static str,
    },

    #[error("provider output field '{0}' is empty")]
    EmptyField(&'static str),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentifyError {
    #[error("invalid identification request: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

impl IdentifyError {
    /// Only transport-level provider failures are worth retrying; the caller
    /// owns the retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            IdentifyError::Provider(ProviderError::NotConfigured(_)) => false,
            IdentifyError::Provider(_) => true,
            IdentifyError::Validation(_) | IdentifyError::Synthesis(_) => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IdentifyError::Validation(_) => "validation",
            IdentifyError::Provider(_) => "provider",
            IdentifyError::Synthesis(_) => "synthesis",
        }
    }
}

pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
