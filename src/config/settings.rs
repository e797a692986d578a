//! Configuration settings for Sikt.

use crate::segmentation::SegmentationConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub segmentation: SegmentationConfig,
    pub extraction: ExtractionSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub answer: AnswerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.sikt".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// VLM extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Vision-language model used for segment description.
    pub model: String,
    /// Maximum attempts per segment for transient failures.
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds (doubles per attempt).
    pub base_delay_ms: u64,
    /// Cap on the backoff delay in milliseconds.
    pub max_delay_ms: u64,
    /// Maximum concurrent outbound extraction calls.
    pub max_concurrent_calls: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8000,
            max_concurrent_calls: 4,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1024,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.sikt/index.db".to_string(),
        }
    }
}

/// How segments with unknown difficulty (degraded extractions) participate
/// in retrieval ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownDifficultyPolicy {
    /// Rank them like any other segment.
    #[default]
    Rank,
    /// Keep them, but after every known-difficulty hit.
    Deprioritize,
    /// Drop them from results entirely.
    Exclude,
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of segments retrieved per query.
    pub top_k: usize,
    /// Similarity score below which a hit is treated as irrelevant.
    pub relevance_floor: f32,
    /// Ranking policy for unknown-difficulty segments.
    pub unknown_difficulty: UnknownDifficultyPolicy,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            relevance_floor: 0.3,
            unknown_difficulty: UnknownDifficultyPolicy::default(),
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerSettings {
    /// LLM model for grounded answer generation.
    pub model: String,
    /// Maximum attempts for transient failures.
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds.
    pub base_delay_ms: u64,
    /// Cap on the backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for AnswerSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8000,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SiktError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sikt")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.retrieval.top_k, 5);
        assert!(settings.retrieval.relevance_floor > 0.0);
        assert_eq!(settings.extraction.max_attempts, 5);
        assert_eq!(settings.embedding.dimensions, 1024);
        assert_eq!(
            settings.retrieval.unknown_difficulty,
            UnknownDifficultyPolicy::Rank
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [retrieval]
            top_k = 8
            unknown_difficulty = "deprioritize"
            "#,
        )
        .unwrap();
        assert_eq!(settings.retrieval.top_k, 8);
        assert_eq!(
            settings.retrieval.unknown_difficulty,
            UnknownDifficultyPolicy::Deprioritize
        );
        assert_eq!(settings.extraction.model, "gpt-4o-mini");
    }
}
