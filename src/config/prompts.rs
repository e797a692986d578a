//! Prompt templates for Sikt.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub extraction: ExtractionPrompts,
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for VLM segment extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ExtractionPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a video content analyst describing lecture segments for a blind or low-vision learner.

For each segment you receive a media clip reference and the transcript for that time range. Describe any diagrams, models, equations, or visual elements in enough detail that someone who cannot see the screen fully understands them.

Respond with a single JSON object containing exactly these fields:
- "visual_description": detailed description of the visuals during this segment (string)
- "cognitive_summary": one or two sentences on what the segment teaches (string)
- "technical_details": formulas, code, or figures shown, in order (array of strings)
- "speaker_info": who is speaking, if identifiable, else null (string or null)
- "key_concepts": the concepts covered (array of strings)
- "difficulty": one of "beginner", "intermediate", "advanced"

Output only the JSON object, no markdown fences or commentary."#
                .to_string(),

            user: r#"Segment {{timestamp_start}} - {{timestamp_end}} of the video.

Media clip: {{media_handle}}

Transcript for this segment:
{{transcript}}

Describe this segment as the JSON object specified."#
                .to_string(),
        }
    }
}

/// Prompts for grounded answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
    /// Appended when the first response fails validation.
    pub repair_instruction: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a helpful and scholarly assistant for a blind or low-vision learner exploring a video.

Guidelines:
- Answer the user's query based *only* on the provided video context; do not use outside knowledge
- Be clear, concise, and descriptive; the answer will be read aloud
- Cite the timestamps of the context entries that support your answer
- If the context does not contain the information, say so plainly

Respond with a single JSON object:
- "answer": the spoken-ready answer text (string)
- "citations": the timestamps from the context you relied on, e.g. ["01:15", "02:40"] (array of strings)

Output only the JSON object."#
                .to_string(),

            user: r#"CONTEXT FROM VIDEO:
{{context}}

USER QUERY:
{{question}}

Answer as the JSON object specified."#
                .to_string(),

            repair_instruction:
                "Your previous reply was not valid JSON. Respond again with only the JSON object, \
                 no fences, no commentary."
                    .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let extraction_path = custom_path.join("extraction.toml");
            if extraction_path.exists() {
                let content = std::fs::read_to_string(&extraction_path)?;
                prompts.extraction = toml::from_str(&content)?;
            }

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
