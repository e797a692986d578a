//! Embedding generation for semantic indexing and retrieval.
//!
//! The same embedder instance must be used at indexing time and query time;
//! mixing embedding functions between index and query is a defect, not a
//! supported configuration. The orchestrator enforces this by sharing a
//! single `Arc<dyn Embedder>` between the ingestion pipeline and the
//! retriever.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation. Deterministic given identical text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
