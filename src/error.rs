//! Error types for Sikt.
//!
//! Outbound model-call failures are pre-classified as [`SiktError::Transient`]
//! (worth retrying with backoff) or [`SiktError::Permanent`] (retrying cannot
//! help); everything downstream branches on that distinction rather than
//! re-inspecting provider errors.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for Sikt operations.
#[derive(Error, Debug)]
pub enum SiktError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The media manifest cannot be decoded or validated. Fatal for the job.
    #[error("Media unreadable: {0}")]
    MediaUnreadable(String),

    /// A retryable failure (rate limit, 5xx, network).
    #[error("Transient failure: {0}")]
    Transient(String),

    /// A failure retrying cannot fix (invalid input, content refusal).
    #[error("Permanent failure: {0}")]
    Permanent(String),

    /// The answer model produced no valid output within the retry budget.
    #[error("Answer generation failed: {0}")]
    GenerationFailed(String),

    /// Queried a job that has not finished ingesting.
    #[error("Job {job_id} is not ready for queries (status: {status})")]
    JobNotReady { job_id: Uuid, status: String },

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl SiktError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SiktError::Transient(_))
    }
}

/// Result type alias for Sikt operations.
pub type Result<T> = std::result::Result<T, SiktError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(SiktError::Transient("rate limit".into()).is_transient());
        assert!(!SiktError::Permanent("refused".into()).is_transient());
        assert!(!SiktError::MediaUnreadable("bad manifest".into()).is_transient());
        assert!(!SiktError::GenerationFailed("invalid json".into()).is_transient());
    }
}
