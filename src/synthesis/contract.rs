use serde_json::{json, Map, Value};

use crate::models::IdentificationResult;

use super::error::{json_kind, SynthesisError};

const PLANT_TYPE: &str = "plantType";
const GROWTH_EFFECT: &str = "growthEffect";
const BLOOMING_VARIATION: &str = "bloomingVariation";
const LEAF_SHAPE: &str = "leafShape";
const PARTICLE_EFFECT: &str = "particleEffect";

struct FieldDef {
    name: &'static str,
    description: &'static str,
}

const FIELDS: [FieldDef; 5] = [
    FieldDef {
        name: PLANT_TYPE,
        description: "The identified type of plant.",
    },
    FieldDef {
        name: GROWTH_EFFECT,
        description: "Suggested growth effect for the plant.",
    },
    FieldDef {
        name: BLOOMING_VARIATION,
        description: "Suggested blooming variation for the plant.",
    },
    FieldDef {
        name: LEAF_SHAPE,
        description: "Suggested leaf shape for the plant.",
    },
    FieldDef {
        name: PARTICLE_EFFECT,
        description: "Suggested particle effect for the plant.",
    },
];

/// Output contract for identification results: the schema handed to the
/// provider, plus the independent check run on whatever comes back.
#[derive(Debug, Clone)]
pub struct OutputContract {
    response_schema: Value,
}

impl Default for OutputContract {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputContract {
    pub fn new() -> Self {
        let properties: Map<String, Value> = FIELDS
            .iter()
            .map(|field| {
                (
                    field.name.to_string(),
                    json!({ "type": "STRING", "description": field.description }),
                )
            })
            .collect();
        let required: Vec<&str> = FIELDS.iter().map(|field| field.name).collect();

        Self {
            response_schema: json!({
                "type": "OBJECT",
                "properties": properties,
                "required": required,
            }),
        }
    }

    pub fn response_schema(&self) -> &Value {
        &self.response_schema
    }

    pub fn field_names() -> impl Iterator<Item = &'static str> {
        FIELDS.iter().map(|field| field.name)
    }

    /// Never trusts the provider's own schema enforcement. Extra keys are
    /// ignored; the five fields are returned exactly as sent.
    pub fn validate(&self, output: &Value) -> Result<IdentificationResult, SynthesisError> {
        let object = output
            .as_object()
            .ok_or_else(|| SynthesisError::NotAnObject(json_kind(output)))?;

        Ok(IdentificationResult {
            plant_type: required_text(object, PLANT_TYPE)?,
            growth_effect: required_text(object, GROWTH_EFFECT)?,
            blooming_variation: required_text(object, BLOOMING_VARIATION)?,
            leaf_shape: required_text(object, LEAF_SHAPE)?,
            particle_effect: required_text(object, PARTICLE_EFFECT)?,
        })
    }
}

fn required_text(object: &Map<String, Value>, field: &'static str) -> Result<String, SynthesisError> {
    let value = object
        .get(field)
        .ok_or(SynthesisError::MissingField(field))?;

    let text = value.as_str().ok_or(SynthesisError::WrongType {
        field,
        found: json_kind(value),
    })?;

    if text.trim().is_empty() {
        return Err(SynthesisError::EmptyField(field));
    }

    Ok(text.to_string())
}
