//! SQLite-based vector index implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large indexes consider the sqlite-vec extension or a dedicated
//! vector database.

use super::{cosine_similarity, rank_hits, IndexedEntry, IndexedJob, SearchHit, VectorStore};
use crate::error::{Result, SiktError};
use crate::extraction::{Difficulty, EnrichedSegment};
use crate::segmentation::Segment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// SQLite-backed vector index, durable across restarts.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
        doc_id TEXT PRIMARY KEY,
        job_id TEXT NOT NULL,
        ordinal INTEGER NOT NULL,
        source TEXT NOT NULL,
        start_seconds REAL NOT NULL,
        end_seconds REAL NOT NULL,
        transcript TEXT NOT NULL,
        media_handle TEXT NOT NULL,
        visual_description TEXT NOT NULL,
        cognitive_summary TEXT NOT NULL,
        technical_details TEXT NOT NULL,
        speaker_info TEXT,
        key_concepts TEXT NOT NULL,
        difficulty TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_entries_job_id ON entries(job_id);
    CREATE INDEX IF NOT EXISTS idx_entries_indexed_at ON entries(indexed_at);
"#;

impl SqliteVectorStore {
    /// Open (or create) an index at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector index at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory index (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<IndexedEntry> {
        let doc_id: String = row.get(0)?;
        let job_id_str: String = row.get(1)?;
        let technical_details_json: String = row.get(10)?;
        let key_concepts_json: String = row.get(12)?;
        let difficulty_str: String = row.get(13)?;
        let embedding_bytes: Vec<u8> = row.get(14)?;
        let indexed_at_str: String = row.get(15)?;

        let segment = Segment {
            job_id: Uuid::parse_str(&job_id_str).unwrap_or_default(),
            ordinal: row.get(2)?,
            start_seconds: row.get(4)?,
            end_seconds: row.get(5)?,
            transcript: row.get(6)?,
            media_handle: row.get(7)?,
        };

        Ok(IndexedEntry {
            doc_id,
            segment: EnrichedSegment {
                segment,
                visual_description: row.get(8)?,
                cognitive_summary: row.get(9)?,
                technical_details: serde_json::from_str(&technical_details_json)
                    .unwrap_or_default(),
                speaker_info: row.get(11)?,
                key_concepts: serde_json::from_str(&key_concepts_json).unwrap_or_default(),
                difficulty: difficulty_str.parse().unwrap_or(Difficulty::Unknown),
            },
            embedding: Self::bytes_to_embedding(&embedding_bytes),
            indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
    }
}

const ENTRY_COLUMNS: &str = "doc_id, job_id, ordinal, source, start_seconds, end_seconds, \
     transcript, media_handle, visual_description, cognitive_summary, technical_details, \
     speaker_info, key_concepts, difficulty, embedding, indexed_at";

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn add_batch(&self, entries: &[IndexedEntry]) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let tx = conn.unchecked_transaction()?;

        for entry in entries {
            let seg = &entry.segment;
            let source = seg
                .segment
                .media_handle
                .split('#')
                .next()
                .unwrap_or_default();
            let technical_details = serde_json::to_string(&seg.technical_details)
                .map_err(|e| SiktError::VectorStore(e.to_string()))?;
            let key_concepts = serde_json::to_string(&seg.key_concepts)
                .map_err(|e| SiktError::VectorStore(e.to_string()))?;

            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO entries ({}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                    ENTRY_COLUMNS
                ),
                params![
                    entry.doc_id,
                    seg.segment.job_id.to_string(),
                    seg.segment.ordinal,
                    source,
                    seg.segment.start_seconds,
                    seg.segment.end_seconds,
                    seg.segment.transcript,
                    seg.segment.media_handle,
                    seg.visual_description,
                    seg.cognitive_summary,
                    technical_details,
                    seg.speaker_info,
                    key_concepts,
                    seg.difficulty.to_string(),
                    Self::embedding_to_bytes(&entry.embedding),
                    entry.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Batch indexed {} entries", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, embedding))]
    async fn query(&self, job_id: Uuid, embedding: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entries WHERE job_id = ?1",
            ENTRY_COLUMNS
        ))?;

        let entries = stmt.query_map(params![job_id.to_string()], Self::row_to_entry)?;

        let mut hits: Vec<SearchHit> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| {
                let score = cosine_similarity(embedding, &entry.embedding);
                SearchHit {
                    segment: entry.segment,
                    score,
                }
            })
            .collect();

        rank_hits(&mut hits);
        hits.truncate(k);

        debug!("Found {} hits for job {}", hits.len(), job_id);
        Ok(hits)
    }

    #[instrument(skip(self))]
    async fn purge_job(&self, job_id: Uuid) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let deleted = conn.execute(
            "DELETE FROM entries WHERE job_id = ?1",
            params![job_id.to_string()],
        )?;

        info!("Purged {} entries for job {}", deleted, job_id);
        Ok(deleted)
    }

    #[instrument(skip(self))]
    async fn list_jobs(&self) -> Result<Vec<IndexedJob>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let mut stmt = conn.prepare(
            r#"
            SELECT job_id, MIN(source), COUNT(*) as entry_count,
                   MAX(end_seconds) as total_duration, MAX(indexed_at) as indexed_at
            FROM entries
            GROUP BY job_id
            ORDER BY indexed_at DESC
            "#,
        )?;

        let jobs = stmt.query_map([], |row| {
            let job_id_str: String = row.get(0)?;
            let indexed_at_str: String = row.get(4)?;
            Ok(IndexedJob {
                job_id: Uuid::parse_str(&job_id_str).unwrap_or_default(),
                source: row.get(1)?,
                entry_count: row.get(2)?,
                total_duration_seconds: row.get(3)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        Ok(jobs.filter_map(|j| j.ok()).collect())
    }

    async fn is_job_indexed(&self, job_id: Uuid) -> Result<bool> {
        Ok(self.entry_count(job_id).await? > 0)
    }

    async fn entry_count(&self, job_id: Uuid) -> Result<usize> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE job_id = ?1",
            params![job_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::entry;
    use super::*;

    #[tokio::test]
    async fn test_add_query_purge() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let job_id = Uuid::new_v4();

        let entries = vec![
            entry(job_id, 0, 0.0, vec![1.0, 0.0, 0.0]),
            entry(job_id, 1, 10.0, vec![0.0, 1.0, 0.0]),
        ];
        store.add_batch(&entries).await.unwrap();

        assert!(store.is_job_indexed(job_id).await.unwrap());
        assert_eq!(store.entry_count(job_id).await.unwrap(), 2);

        let hits = store.query(job_id, &[1.0, 0.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!((hits[0].score - 1.0).abs() < 0.001);
        assert_eq!(hits[0].segment.segment.ordinal, 0);

        let purged = store.purge_job(job_id).await.unwrap();
        assert_eq!(purged, 2);
        assert!(!store.is_job_indexed(job_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_queries_are_job_scoped() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let job_a = Uuid::new_v4();
        let job_b = Uuid::new_v4();

        store
            .add_batch(&[
                entry(job_a, 0, 0.0, vec![1.0, 0.0]),
                entry(job_b, 0, 0.0, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.query(job_a, &[1.0, 0.0], 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].segment.segment.job_id, job_a);
    }

    #[tokio::test]
    async fn test_k_bounds() {
        let store = SqliteVectorStore::in_memory().unwrap();
        let job_id = Uuid::new_v4();
        store
            .add_batch(&[
                entry(job_id, 0, 0.0, vec![1.0, 0.0]),
                entry(job_id, 1, 10.0, vec![0.5, 0.5]),
            ])
            .await
            .unwrap();

        assert!(store.query(job_id, &[1.0, 0.0], 0).await.unwrap().is_empty());
        assert_eq!(store.query(job_id, &[1.0, 0.0], 50).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let job_id = Uuid::new_v4();

        {
            let store = SqliteVectorStore::new(&path).unwrap();
            store
                .add_batch(&[entry(job_id, 0, 0.0, vec![1.0, 0.0])])
                .await
                .unwrap();
        }

        let store = SqliteVectorStore::new(&path).unwrap();
        assert!(store.is_job_indexed(job_id).await.unwrap());

        let jobs = store.list_jobs().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_id, job_id);
        assert_eq!(jobs[0].entry_count, 1);
        assert_eq!(jobs[0].source, "video.mp4");
    }
}
