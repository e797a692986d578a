//! Semantic retrieval over the job-scoped vector index.

use crate::config::{RetrievalSettings, UnknownDifficultyPolicy};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::extraction::Difficulty;
use crate::vector_store::{SearchHit, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Ordered retrieval result for one query: best match first, ties broken by
/// ascending start time.
#[derive(Debug, Clone)]
pub struct RetrievedContext {
    /// Query hits in rank order.
    pub hits: Vec<SearchHit>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Embeds queries and ranks segments against a single job's index.
///
/// Must share the embedder instance used at indexing time; the orchestrator
/// passes the same `Arc<dyn Embedder>` to both sides.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            settings,
        }
    }

    /// Retrieve the top segments of a job for a free-form question.
    #[instrument(skip(self, question), fields(job_id = %job_id))]
    pub async fn retrieve(&self, job_id: Uuid, question: &str) -> Result<RetrievedContext> {
        self.retrieve_top(job_id, question, self.settings.top_k).await
    }

    /// Retrieve with an explicit result bound.
    pub async fn retrieve_top(
        &self,
        job_id: Uuid,
        question: &str,
        k: usize,
    ) -> Result<RetrievedContext> {
        let query_embedding = self.embedder.embed(question).await?;

        // Over-fetch when excluding so the bound applies after filtering.
        let fetch = match self.settings.unknown_difficulty {
            UnknownDifficultyPolicy::Exclude => k.saturating_mul(2),
            _ => k,
        };

        let hits = self.store.query(job_id, &query_embedding, fetch).await?;
        let hits = apply_policy(hits, self.settings.unknown_difficulty, k);

        debug!("Retrieved {} segments for job {}", hits.len(), job_id);
        Ok(RetrievedContext { hits })
    }

    /// The relevance floor configured for downstream context assembly.
    pub fn relevance_floor(&self) -> f32 {
        self.settings.relevance_floor
    }
}

/// Apply the configured treatment of `Unknown`-difficulty segments.
///
/// Re-ranking is stable, so within each group the score/start-time order from
/// the store is preserved.
fn apply_policy(
    hits: Vec<SearchHit>,
    policy: UnknownDifficultyPolicy,
    k: usize,
) -> Vec<SearchHit> {
    let mut hits = match policy {
        UnknownDifficultyPolicy::Rank => hits,
        UnknownDifficultyPolicy::Deprioritize => {
            let (known, unknown): (Vec<_>, Vec<_>) = hits
                .into_iter()
                .partition(|h| h.segment.difficulty != Difficulty::Unknown);
            known.into_iter().chain(unknown).collect()
        }
        UnknownDifficultyPolicy::Exclude => hits
            .into_iter()
            .filter(|h| h.segment.difficulty != Difficulty::Unknown)
            .collect(),
    };
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{EnrichedSegment, ExtractionRecord};
    use crate::segmentation::Segment;

    fn hit(ordinal: u32, score: f32, difficulty: Difficulty) -> SearchHit {
        let segment = Segment {
            job_id: Uuid::nil(),
            ordinal,
            start_seconds: ordinal as f64 * 10.0,
            end_seconds: (ordinal + 1) as f64 * 10.0,
            transcript: String::new(),
            media_handle: format!("v.mp4#t={},{}", ordinal * 10, (ordinal + 1) * 10),
        };
        let record = ExtractionRecord {
            difficulty,
            ..Default::default()
        };
        SearchHit {
            segment: EnrichedSegment::from_record(segment, record),
            score,
        }
    }

    #[test]
    fn test_rank_policy_leaves_order() {
        let hits = vec![
            hit(0, 0.9, Difficulty::Unknown),
            hit(1, 0.8, Difficulty::Beginner),
        ];
        let ranked = apply_policy(hits, UnknownDifficultyPolicy::Rank, 5);
        assert_eq!(ranked[0].segment.segment.ordinal, 0);
    }

    #[test]
    fn test_deprioritize_moves_unknown_last() {
        let hits = vec![
            hit(0, 0.9, Difficulty::Unknown),
            hit(1, 0.8, Difficulty::Beginner),
            hit(2, 0.7, Difficulty::Unknown),
            hit(3, 0.6, Difficulty::Advanced),
        ];
        let ranked = apply_policy(hits, UnknownDifficultyPolicy::Deprioritize, 5);
        let ordinals: Vec<u32> = ranked.iter().map(|h| h.segment.segment.ordinal).collect();
        assert_eq!(ordinals, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_exclude_drops_unknown_and_bounds() {
        let hits = vec![
            hit(0, 0.9, Difficulty::Unknown),
            hit(1, 0.8, Difficulty::Beginner),
            hit(2, 0.7, Difficulty::Intermediate),
        ];
        let ranked = apply_policy(hits, UnknownDifficultyPolicy::Exclude, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].segment.segment.ordinal, 1);
    }
}
