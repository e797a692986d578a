//! Client for the vision-language extraction call.

use crate::config::Prompts;
use crate::error::{Result, SiktError};
use crate::openai::{classify_error, create_client};
use crate::segmentation::Segment;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// A single extraction call against a multimodal model.
///
/// One network call per invocation, no retry at this layer; retry policy
/// lives in the enricher. Errors arrive pre-classified as `Transient` or
/// `Permanent`. The raw text is returned unvalidated; structural repair is
/// the parser's job.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    async fn extract(&self, segment: &Segment) -> Result<String>;
}

/// OpenAI-backed extraction client.
pub struct OpenAIExtractionClient {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    prompts: Prompts,
}

impl OpenAIExtractionClient {
    /// Create a client for the given VLM model.
    pub fn new(model: &str, prompts: Prompts) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            prompts,
        }
    }

    fn build_user_prompt(&self, segment: &Segment) -> String {
        let mut vars = HashMap::new();
        vars.insert(
            "timestamp_start".to_string(),
            crate::segmentation::format_timestamp(segment.start_seconds),
        );
        vars.insert(
            "timestamp_end".to_string(),
            crate::segmentation::format_timestamp(segment.end_seconds),
        );
        vars.insert("media_handle".to_string(), segment.media_handle.clone());
        vars.insert("transcript".to_string(), segment.transcript.clone());

        self.prompts
            .render_with_custom(&self.prompts.extraction.user, &vars)
    }
}

#[async_trait]
impl ExtractionClient for OpenAIExtractionClient {
    #[instrument(skip(self), fields(doc_id = %segment.doc_id()))]
    async fn extract(&self, segment: &Segment) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.extraction.system.clone())
                .build()
                .map_err(|e| SiktError::Permanent(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(self.build_user_prompt(segment))
                .build()
                .map_err(|e| SiktError::Permanent(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.2)
            .build()
            .map_err(|e| SiktError::Permanent(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| SiktError::Permanent("Empty extraction response".to_string()))?;

        debug!("Extraction response: {} chars", content.len());
        Ok(content.clone())
    }
}
