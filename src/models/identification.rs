use serde::{Deserialize, Serialize};

/// Inbound request for plant characteristic synthesis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationRequest {
    /// Photo as a data URI: `data:<mimetype>;base64,<encoded_data>`.
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl IdentificationRequest {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Attribute suggestions returned by the synthesizer. Every field is
/// free-form text and guaranteed non-blank once validated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResult {
    pub plant_type: String,
    pub growth_effect: String,
    pub blooming_variation: String,
    pub leaf_shape: String,
    pub particle_effect: String,
}
