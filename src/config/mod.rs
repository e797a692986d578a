//! Configuration management for Sikt.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, ExtractionPrompts, Prompts};
pub use settings::{
    AnswerSettings, EmbeddingSettings, ExtractionSettings, GeneralSettings, PromptSettings,
    RetrievalSettings, Settings, UnknownDifficultyPolicy, VectorStoreSettings,
};
