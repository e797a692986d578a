//! Grounded answer generation against the assembled context.

use super::{PromptContext, QueryPhase};
use crate::config::Prompts;
use crate::error::{Result, SiktError};
use crate::extraction::repair::strip_fences;
use crate::openai::{classify_error, create_client};
use crate::retry::{with_backoff, RetryPolicy};
use crate::segmentation::parse_timestamp;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Fixed reply when the video holds nothing relevant to the question.
const NOT_FOUND_ANSWER: &str =
    "I could not find anything in this video that answers that question.";

/// A validated, citation-bearing answer.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Spoken-ready answer text.
    pub text: String,
    /// Timestamps from the context the answer relies on, chronological and
    /// deduplicated. Empty for the not-found path.
    pub citations: Vec<String>,
    /// Model calls spent producing this answer.
    pub attempts: u32,
}

impl Answer {
    /// The fixed answer used when the context is empty.
    pub fn not_found() -> Self {
        Self {
            text: NOT_FOUND_ANSWER.to_string(),
            citations: Vec::new(),
            attempts: 0,
        }
    }

    /// Whether this is the fixed not-found reply.
    pub fn is_not_found(&self) -> bool {
        self.text == NOT_FOUND_ANSWER
    }
}

/// One chat completion call. Retry and validation live in the generator.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// OpenAI-backed answer model.
pub struct OpenAIAnswerModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAIAnswerModel {
    pub fn new(model: &str) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl AnswerModel for OpenAIAnswerModel {
    #[instrument(skip_all)]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| SiktError::Permanent(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| SiktError::Permanent(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.3)
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
            .ok_or_else(|| SiktError::Permanent("Empty completion response".to_string()))?;

        Ok(content.clone())
    }
}

/// The wire shape the model is asked to return.
#[derive(Debug, Deserialize)]
struct RawAnswer {
    answer: String,
    #[serde(default)]
    citations: Vec<String>,
}

/// Produces grounded answers from an assembled context.
///
/// The model is never consulted on an empty context; that path returns the
/// fixed not-found answer directly.
pub struct AnswerGenerator {
    model: std::sync::Arc<dyn AnswerModel>,
    prompts: Prompts,
    policy: RetryPolicy,
}

impl AnswerGenerator {
    pub fn new(
        model: std::sync::Arc<dyn AnswerModel>,
        prompts: Prompts,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            model,
            prompts,
            policy,
        }
    }

    /// Generate an answer to `question` grounded in `context`.
    ///
    /// Invalid JSON from the model is retried once with an explicit format
    /// reminder; a second invalid reply is `GenerationFailed`.
    #[instrument(skip(self, question, context), fields(entries = context.entries.len()))]
    pub async fn generate(&self, question: &str, context: &PromptContext) -> Result<Answer> {
        if context.is_empty() {
            debug!("Empty context, taking not-found path");
            return Ok(Answer::not_found());
        }

        let system = self.prompts.answer.system.clone();
        let user = self.build_user_prompt(question, context);

        let first = with_backoff(&self.policy, || self.model.complete(&system, &user)).await?;
        let mut attempts = first.attempts;

        debug!(phase = %QueryPhase::Validating, "Validating answer format");
        let raw = match validate(&first.value) {
            Ok(raw) => raw,
            Err(parse_err) => {
                warn!("Answer failed validation ({}), retrying with format reminder", parse_err);
                let augmented =
                    format!("{}\n\n{}", user, self.prompts.answer.repair_instruction);
                let second =
                    with_backoff(&self.policy, || self.model.complete(&system, &augmented))
                        .await?;
                attempts += second.attempts;
                validate(&second.value).map_err(|e| {
                    SiktError::GenerationFailed(format!(
                        "Model did not return valid JSON after a retry: {}",
                        e
                    ))
                })?
            }
        };

        Ok(Answer {
            text: raw.answer,
            citations: ground_citations(&raw.citations, context),
            attempts,
        })
    }

    fn build_user_prompt(&self, question: &str, context: &PromptContext) -> String {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), context.render());
        vars.insert("question".to_string(), question.to_string());
        self.prompts
            .render_with_custom(&self.prompts.answer.user, &vars)
    }
}

/// Strict parse of the model reply after fence stripping.
fn validate(raw: &str) -> std::result::Result<RawAnswer, serde_json::Error> {
    serde_json::from_str(&strip_fences(raw))
}

/// Keep only citations naming timestamps actually present in the context,
/// normalized, deduplicated, in chronological order.
fn ground_citations(claimed: &[String], context: &PromptContext) -> Vec<String> {
    let claimed_seconds: std::collections::HashSet<u32> = claimed
        .iter()
        .filter_map(|c| parse_timestamp(c))
        .collect();

    context
        .entries
        .iter()
        .filter(|e| {
            parse_timestamp(&e.citation)
                .map(|s| claimed_seconds.contains(&s))
                .unwrap_or(false)
        })
        .map(|e| e.citation.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::ContextEntry;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn context(timestamps: &[(f64, &str)]) -> PromptContext {
        PromptContext {
            entries: timestamps
                .iter()
                .map(|(start, citation)| ContextEntry {
                    citation: citation.to_string(),
                    start_seconds: *start,
                    score: 0.9,
                    text: format!("content at {}", citation),
                })
                .collect(),
        }
    }

    struct ScriptedModel {
        calls: AtomicU32,
        script: fn(u32) -> Result<String>,
    }

    #[async_trait]
    impl AnswerModel for ScriptedModel {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.script)(n)
        }
    }

    fn generator(model: Arc<ScriptedModel>) -> AnswerGenerator {
        AnswerGenerator::new(model, Prompts::default(), RetryPolicy::from_millis(3, 1, 2))
    }

    #[tokio::test]
    async fn test_empty_context_short_circuits() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicU32::new(0),
            script: |_| panic!("model must not be called"),
        });
        let gen = generator(model.clone());

        let answer = gen.generate("what?", &PromptContext::default()).await.unwrap();
        assert!(answer.is_not_found());
        assert!(answer.citations.is_empty());
        assert_eq!(answer.attempts, 0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_reply_with_grounded_citations() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicU32::new(0),
            script: |_| {
                Ok(r#"{"answer": "The derivative is 2x.", "citations": ["01:15", "99:59"]}"#
                    .to_string())
            },
        });
        let gen = generator(model);

        let ctx = context(&[(75.0, "01:15"), (160.0, "02:40")]);
        let answer = gen.generate("what is the derivative?", &ctx).await.unwrap();

        assert_eq!(answer.text, "The derivative is 2x.");
        // The fabricated 99:59 is dropped.
        assert_eq!(answer.citations, vec!["01:15"]);
        assert_eq!(answer.attempts, 1);
    }

    #[tokio::test]
    async fn test_fenced_reply_accepted() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicU32::new(0),
            script: |_| {
                Ok("```json\n{\"answer\": \"ok\", \"citations\": []}\n```".to_string())
            },
        });
        let gen = generator(model);

        let answer = gen.generate("q", &context(&[(0.0, "00:00")])).await.unwrap();
        assert_eq!(answer.text, "ok");
    }

    #[tokio::test]
    async fn test_invalid_json_retried_once_then_fails() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicU32::new(0),
            script: |_| Ok("I think the answer is blue.".to_string()),
        });
        let gen = generator(model.clone());

        let err = gen
            .generate("q", &context(&[(0.0, "00:00")]))
            .await
            .unwrap_err();
        assert!(matches!(err, SiktError::GenerationFailed(_)));
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_then_valid_recovers() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicU32::new(0),
            script: |n| {
                if n == 0 {
                    Ok("not json".to_string())
                } else {
                    Ok(r#"{"answer": "recovered", "citations": ["00:00"]}"#.to_string())
                }
            },
        });
        let gen = generator(model);

        let answer = gen.generate("q", &context(&[(0.0, "00:00")])).await.unwrap();
        assert_eq!(answer.text, "recovered");
        assert_eq!(answer.citations, vec!["00:00"]);
        assert_eq!(answer.attempts, 2);
    }

    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_validating_phase_traced() {
        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let model = Arc::new(ScriptedModel {
            calls: AtomicU32::new(0),
            script: |_| Ok(r#"{"answer": "ok", "citations": []}"#.to_string()),
        });
        let gen = generator(model);
        gen.generate("q", &context(&[(0.0, "00:00")])).await.unwrap();
        drop(_guard);

        let logs = String::from_utf8(writer.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("validating"), "missing validating phase: {}", logs);
    }

    #[tokio::test]
    async fn test_citations_chronological_and_deduped() {
        let model = Arc::new(ScriptedModel {
            calls: AtomicU32::new(0),
            script: |_| {
                Ok(r#"{"answer": "a", "citations": ["02:40", "01:15", "02:40"]}"#.to_string())
            },
        });
        let gen = generator(model);

        let ctx = context(&[(75.0, "01:15"), (160.0, "02:40")]);
        let answer = gen.generate("q", &ctx).await.unwrap();
        assert_eq!(answer.citations, vec!["01:15", "02:40"]);
    }
}
