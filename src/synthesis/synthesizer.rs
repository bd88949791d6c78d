use std::{sync::Arc, time::Instant};

use uuid::Uuid;

use crate::models::{IdentificationRequest, IdentificationResult};
use crate::{log_debug, log_error, log_info, log_warn};

use super::{
    contract::OutputContract,
    error::IdentifyError,
    image_payload::ImagePayload,
    prompt::PromptTemplate,
    provider::{CompletionProvider, GenerationRequest, InlineImage},
};

const ENABLE_LOGS: bool = true;

/// Turns a plant photo into structured attribute suggestions.
///
/// Holds no mutable state: clones share the provider and concurrent
/// `identify` calls are independent of each other.
#[derive(Clone)]
pub struct Synthesizer {
    provider: Arc<dyn CompletionProvider>,
    contract: Arc<OutputContract>,
    template: Arc<PromptTemplate>,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self::with_template(provider, PromptTemplate::default())
    }

    pub fn with_template(provider: Arc<dyn CompletionProvider>, template: PromptTemplate) -> Self {
        Self {
            provider,
            contract: Arc::new(OutputContract::new()),
            template: Arc::new(template),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn identify(
        &self,
        request: &IdentificationRequest,
    ) -> Result<IdentificationResult, IdentifyError> {
        let request_id = short_request_id();
        let started = Instant::now();

        let image = match self.validate_image(&request.image).await {
            Ok(image) => image,
            Err(err) => {
                log_warn!("identify {request_id}: rejected request: {err}");
                return Err(err);
            }
        };

        let generation = GenerationRequest {
            instruction: self.template.render(request.notes.as_deref()),
            image: InlineImage {
                mime_type: image.media_type().to_string(),
                data_base64: image.encoded().to_string(),
            },
            response_schema: self.contract.response_schema().clone(),
        };

        log_debug!(
            "identify {request_id}: sending {} ({} bytes) to {}",
            image.media_type(),
            image.byte_len(),
            self.provider.name()
        );

        let output = match self.provider.generate(generation).await {
            Ok(output) => output,
            Err(err) => {
                log_error!(
                    "identify {request_id}: {} failed after {}ms: {err}",
                    self.provider.name(),
                    started.elapsed().as_millis()
                );
                return Err(err.into());
            }
        };

        match self.contract.validate(&output) {
            Ok(result) => {
                log_info!(
                    "identify {request_id}: identified '{}' in {}ms",
                    result.plant_type,
                    started.elapsed().as_millis()
                );
                Ok(result)
            }
            Err(err) => {
                log_warn!("identify {request_id}: provider output rejected: {err}");
                Err(err.into())
            }
        }
    }

    async fn validate_image(&self, data_uri: &str) -> Result<ImagePayload, IdentifyError> {
        let image = ImagePayload::parse(data_uri)?;
        image.verify_decodable().await?;
        Ok(image)
    }
}

fn short_request_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
