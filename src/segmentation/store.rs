//! In-process store of each job's ordered segment sequence.

use super::{segment_media, Segment, SegmentationConfig};
use crate::error::{Result, SiktError};
use crate::media::MediaInput;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;
use uuid::Uuid;

/// Holds the ordered, immutable segment sequence for each video job.
///
/// Produced once per job during segmentation; read at indexing time to
/// enforce the no-orphaned-vectors invariant.
pub struct SegmentStore {
    config: SegmentationConfig,
    segments: RwLock<HashMap<Uuid, Arc<[Segment]>>>,
}

impl SegmentStore {
    /// Create a segment store with the given segmentation policy.
    pub fn new(config: SegmentationConfig) -> Self {
        Self {
            config,
            segments: RwLock::new(HashMap::new()),
        }
    }

    /// Segment the media and record the sequence for this job.
    pub fn create_segments(&self, job_id: Uuid, media: &MediaInput) -> Result<Arc<[Segment]>> {
        let segments: Arc<[Segment]> = segment_media(job_id, media, &self.config)?.into();
        info!("Created {} segments for job {}", segments.len(), job_id);

        self.segments
            .write()
            .map_err(|e| SiktError::VectorStore(format!("Failed to acquire lock: {}", e)))?
            .insert(job_id, segments.clone());

        Ok(segments)
    }

    /// Get the segment sequence for a job, if it exists.
    pub fn get(&self, job_id: Uuid) -> Option<Arc<[Segment]>> {
        self.segments.read().ok()?.get(&job_id).cloned()
    }

    /// Number of segments recorded for a job.
    pub fn segment_count(&self, job_id: Uuid) -> usize {
        self.get(job_id).map(|s| s.len()).unwrap_or(0)
    }

    /// Drop a job's segments (when the job is purged or cancelled).
    pub fn remove(&self, job_id: Uuid) {
        if let Ok(mut map) = self.segments.write() {
            map.remove(&job_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let store = SegmentStore::new(SegmentationConfig::default());
        let job_id = Uuid::new_v4();
        let media = MediaInput {
            source: "talk.mp4".to_string(),
            duration_seconds: 45.0,
            transcript: vec![],
        };

        let created = store.create_segments(job_id, &media).unwrap();
        assert_eq!(store.segment_count(job_id), created.len());

        store.remove(job_id);
        assert!(store.get(job_id).is_none());
    }

    #[test]
    fn test_unreadable_media_not_recorded() {
        let store = SegmentStore::new(SegmentationConfig::default());
        let job_id = Uuid::new_v4();
        let media = MediaInput {
            source: "broken.mp4".to_string(),
            duration_seconds: -1.0,
            transcript: vec![],
        };

        assert!(store.create_segments(job_id, &media).is_err());
        assert_eq!(store.segment_count(job_id), 0);
    }
}
