//! In-memory vector index implementation.
//!
//! Useful for testing and small indexes. Not durable.

use super::{cosine_similarity, rank_hits, IndexedEntry, IndexedJob, SearchHit, VectorStore};
use crate::error::{Result, SiktError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory vector index.
pub struct MemoryVectorStore {
    entries: RwLock<HashMap<String, IndexedEntry>>,
}

impl MemoryVectorStore {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn add_batch(&self, entries: &[IndexedEntry]) -> Result<usize> {
        let mut store = self
            .entries
            .write()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        for entry in entries {
            store.insert(entry.doc_id.clone(), entry.clone());
        }
        Ok(entries.len())
    }

    async fn query(&self, job_id: Uuid, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let store = self
            .entries
            .read()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut hits: Vec<SearchHit> = store
            .values()
            .filter(|entry| entry.job_id() == job_id)
            .map(|entry| SearchHit {
                segment: entry.segment.clone(),
                score: cosine_similarity(embedding, &entry.embedding),
            })
            .collect();

        rank_hits(&mut hits);
        hits.truncate(k);
        Ok(hits)
    }

    async fn purge_job(&self, job_id: Uuid) -> Result<usize> {
        let mut store = self
            .entries
            .write()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        let initial_len = store.len();
        store.retain(|_, entry| entry.job_id() != job_id);
        Ok(initial_len - store.len())
    }

    async fn list_jobs(&self) -> Result<Vec<IndexedJob>> {
        let store = self
            .entries
            .read()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut job_map: HashMap<Uuid, IndexedJob> = HashMap::new();

        for entry in store.values() {
            let seg = &entry.segment.segment;
            let summary = job_map.entry(seg.job_id).or_insert_with(|| IndexedJob {
                job_id: seg.job_id,
                source: seg
                    .media_handle
                    .split('#')
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                entry_count: 0,
                total_duration_seconds: 0.0,
                indexed_at: entry.indexed_at,
            });

            summary.entry_count += 1;
            if seg.end_seconds > summary.total_duration_seconds {
                summary.total_duration_seconds = seg.end_seconds;
            }
            if entry.indexed_at > summary.indexed_at {
                summary.indexed_at = entry.indexed_at;
            }
        }

        let mut jobs: Vec<IndexedJob> = job_map.into_values().collect();
        jobs.sort_by(|a, b| b.indexed_at.cmp(&a.indexed_at));
        Ok(jobs)
    }

    async fn is_job_indexed(&self, job_id: Uuid) -> Result<bool> {
        let store = self
            .entries
            .read()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        Ok(store.values().any(|entry| entry.job_id() == job_id))
    }

    async fn entry_count(&self, job_id: Uuid) -> Result<usize> {
        let store = self
            .entries
            .read()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;
        Ok(store
            .values()
            .filter(|entry| entry.job_id() == job_id)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::entry;
    use super::*;

    #[tokio::test]
    async fn test_memory_store_query_and_purge() {
        let store = MemoryVectorStore::new();
        let job_id = Uuid::new_v4();

        store
            .add_batch(&[
                entry(job_id, 0, 0.0, vec![1.0, 0.0, 0.0]),
                entry(job_id, 1, 10.0, vec![0.0, 1.0, 0.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.entry_count(job_id).await.unwrap(), 2);

        let hits = store.query(job_id, &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].score > hits[1].score);

        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].entry_count, 2);

        assert_eq!(store.purge_job(job_id).await.unwrap(), 2);
        assert!(!store.is_job_indexed(job_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_reindex_replaces_entries() {
        let store = MemoryVectorStore::new();
        let job_id = Uuid::new_v4();

        store
            .add_batch(&[entry(job_id, 0, 0.0, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .add_batch(&[entry(job_id, 0, 0.0, vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(store.entry_count(job_id).await.unwrap(), 1);
        let hits = store.query(job_id, &[0.0, 1.0], 1).await.unwrap();
        assert!((hits[0].score - 1.0).abs() < 0.001);
    }
}
