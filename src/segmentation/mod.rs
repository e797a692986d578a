//! Temporal segmentation of a video into time-bounded segments.
//!
//! Segments prefer natural content-transition boundaries (speech pauses in
//! the transcript stream) over fixed intervals, targeting 5-30 second spans.

mod segmenter;
mod store;

pub use segmenter::{segment_media, SegmentationConfig};
pub use store::SegmentStore;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time-bounded slice of a source video. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Job this segment belongs to.
    pub job_id: Uuid,
    /// Position of this segment in the video's segment sequence.
    pub ordinal: u32,
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Raw transcript slice for this time range (possibly empty).
    pub transcript: String,
    /// Handle to the decoded media clip for this range.
    pub media_handle: String,
}

impl Segment {
    /// Stable document id for this segment within the vector index.
    pub fn doc_id(&self) -> String {
        format!("{}:{}", self.job_id, self.ordinal)
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Format the start timestamp for display and citations.
    pub fn format_timestamp(&self) -> String {
        format_timestamp(self.start_seconds)
    }
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Parse a MM:SS or HH:MM:SS timestamp back to seconds.
pub fn parse_timestamp(value: &str) -> Option<u32> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    let nums: Vec<u32> = parts
        .iter()
        .map(|p| p.parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;

    match nums.as_slice() {
        [m, s] if *s < 60 => Some(m * 60 + s),
        [h, m, s] if *m < 60 && *s < 60 => Some(h * 3600 + m * 60 + s),
        _ => None,
    }
}
