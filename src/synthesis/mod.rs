pub mod contract;
pub mod error;
pub mod gemini;
pub mod image_payload;
pub mod prompt;
pub mod provider;
pub mod synthesizer;

pub use contract::OutputContract;
pub use error::{IdentifyError, ProviderError, SynthesisError, ValidationError};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use image_payload::ImagePayload;
pub use prompt::PromptTemplate;
pub use provider::{CompletionProvider, GenerationRequest, InlineImage};
pub use synthesizer::Synthesizer;
