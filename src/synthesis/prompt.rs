const NOTES_PLACEHOLDER: &str = "{{additional_details}}";

const DEFAULT_TEMPLATE: &str = "You are an expert botanist. You are helping a user identify a plant and its characteristics from a photo and any additional details they provide.

Analyze the attached image together with the details below to suggest plant characteristics.

Additional details: {{additional_details}}

Based on the image and details, identify the plant type and suggest growth effects, blooming variations, leaf shapes and particle effects that would make a visually diverse garden. Consider the plant family, its native environment and common growing conditions.

Respond with a single JSON object containing exactly these string fields, each non-empty: plantType, growthEffect, bloomingVariation, leafShape, particleEffect.";

const NO_NOTES: &str = "none provided";

/// Instruction text sent alongside the image. Holds one
/// `{{additional_details}}` slot for the caller's notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplate {
    /// Custom instruction text. Without a notes slot, notes are appended.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn render(&self, notes: Option<&str>) -> String {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());

        if self.text.contains(NOTES_PLACEHOLDER) {
            return self
                .text
                .replace(NOTES_PLACEHOLDER, notes.unwrap_or(NO_NOTES));
        }

        match notes {
            Some(notes) => format!("{}\n\nAdditional details: {notes}", self.text),
            None => self.text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_notes() {
        let rendered = PromptTemplate::default().render(Some("  found near a creek  "));
        assert!(rendered.contains("Additional details: found near a creek\n"));
        assert!(!rendered.contains(NOTES_PLACEHOLDER));
        assert!(rendered.contains("expert botanist"));
    }

    #[test]
    fn blank_notes_render_as_absent() {
        let template = PromptTemplate::default();
        assert_eq!(template.render(None), template.render(Some("   ")));
        assert!(template.render(None).contains("Additional details: none provided"));
    }

    #[test]
    fn custom_template_without_slot_appends_notes() {
        let template = PromptTemplate::new("Describe this plant.");
        assert_eq!(template.render(None), "Describe this plant.");
        assert_eq!(
            template.render(Some("variegated")),
            "Describe this plant.\n\nAdditional details: variegated"
        );
    }
}
