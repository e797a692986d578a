//! Job-scoped vector index abstraction.
//!
//! Provides a trait-based interface for different vector index backends.
//! Every query is scoped to a single job; entries indexed under one job are
//! never visible to queries against another.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use crate::extraction::EnrichedSegment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An enriched segment stored with its embedding. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEntry {
    /// Stable document id (`job_id:ordinal`).
    pub doc_id: String,
    /// The enriched segment.
    pub segment: EnrichedSegment,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this entry was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl IndexedEntry {
    /// Create a new entry for an enriched segment.
    pub fn new(segment: EnrichedSegment, embedding: Vec<f32>) -> Self {
        Self {
            doc_id: segment.segment.doc_id(),
            segment,
            embedding,
            indexed_at: Utc::now(),
        }
    }

    /// The job this entry belongs to.
    pub fn job_id(&self) -> Uuid {
        self.segment.segment.job_id
    }
}

/// A query hit with its similarity score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The matched segment.
    pub segment: EnrichedSegment,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Summary information about an indexed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedJob {
    /// Job ID.
    pub job_id: Uuid,
    /// Source reference of the video.
    pub source: String,
    /// Number of indexed entries.
    pub entry_count: u32,
    /// Total duration in seconds.
    pub total_duration_seconds: f64,
    /// When the job was indexed.
    pub indexed_at: DateTime<Utc>,
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a batch of entries.
    async fn add_batch(&self, entries: &[IndexedEntry]) -> Result<usize>;

    /// Nearest-neighbor query, scoped to a single job.
    ///
    /// Returns at most `k` hits ordered by descending score, ties broken by
    /// ascending start time. `k = 0` returns nothing; `k` larger than the
    /// number of entries returns them all.
    async fn query(&self, job_id: Uuid, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Delete all entries for a job. Returns how many were removed.
    async fn purge_job(&self, job_id: Uuid) -> Result<usize>;

    /// List all indexed jobs.
    async fn list_jobs(&self) -> Result<Vec<IndexedJob>>;

    /// Check if a job has indexed entries.
    async fn is_job_indexed(&self, job_id: Uuid) -> Result<bool>;

    /// Number of entries indexed for a job.
    async fn entry_count(&self, job_id: Uuid) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Rank hits deterministically: descending score, then ascending start time.
pub(crate) fn rank_hits(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.segment
                    .segment
                    .start_seconds
                    .partial_cmp(&b.segment.segment.start_seconds)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::Segment;

    pub(crate) fn entry(job_id: Uuid, ordinal: u32, start: f64, embedding: Vec<f32>) -> IndexedEntry {
        let segment = Segment {
            job_id,
            ordinal,
            start_seconds: start,
            end_seconds: start + 10.0,
            transcript: format!("transcript {}", ordinal),
            media_handle: format!("video.mp4#t={:.2},{:.2}", start, start + 10.0),
        };
        IndexedEntry::new(EnrichedSegment::degraded(segment), embedding)
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_rank_ties_broken_by_start_time() {
        let job_id = Uuid::new_v4();
        let mut hits = vec![
            SearchHit {
                segment: entry(job_id, 1, 50.0, vec![]).segment,
                score: 0.9,
            },
            SearchHit {
                segment: entry(job_id, 0, 10.0, vec![]).segment,
                score: 0.9,
            },
            SearchHit {
                segment: entry(job_id, 2, 0.0, vec![]).segment,
                score: 0.95,
            },
        ];
        rank_hits(&mut hits);
        assert_eq!(hits[0].score, 0.95);
        assert_eq!(hits[1].segment.segment.start_seconds, 10.0);
        assert_eq!(hits[2].segment.segment.start_seconds, 50.0);
    }
}
