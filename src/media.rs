//! Decoded-media manifest: the contract with the ingestion collaborator.
//!
//! Sikt does no codec or frame-decoding work. A preprocessing collaborator
//! hands over a manifest describing the decoded video: a source reference,
//! the total duration, and a stream of timestamped transcript spans.

use crate::error::{Result, SiktError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A timestamped slice of the audio transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSpan {
    /// Start time in seconds.
    pub start_seconds: f64,
    /// End time in seconds.
    pub end_seconds: f64,
    /// Transcribed text content.
    pub text: String,
}

/// Decoded media handed over by the preprocessing collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInput {
    /// Source reference (URL or path) for the video.
    pub source: String,
    /// Total duration in seconds.
    pub duration_seconds: f64,
    /// Timestamped transcript spans, possibly empty for silent video.
    #[serde(default)]
    pub transcript: Vec<TranscriptSpan>,
}

impl MediaInput {
    /// Load a manifest from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let media: MediaInput = serde_json::from_str(&content)?;
        Ok(media)
    }

    /// Validate that the media is usable for segmentation.
    ///
    /// A non-finite or non-positive duration means the collaborator could
    /// not decode the media; the job must fail with `MediaUnreadable`.
    pub fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(SiktError::MediaUnreadable(
                "empty media source reference".to_string(),
            ));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds <= 0.0 {
            return Err(SiktError::MediaUnreadable(format!(
                "invalid duration for '{}': {}",
                self.source, self.duration_seconds
            )));
        }
        for span in &self.transcript {
            if !span.start_seconds.is_finite()
                || !span.end_seconds.is_finite()
                || span.start_seconds >= span.end_seconds
            {
                return Err(SiktError::MediaUnreadable(format!(
                    "invalid transcript span [{} - {}] in '{}'",
                    span.start_seconds, span.end_seconds, self.source
                )));
            }
        }
        Ok(())
    }

    /// A media-fragment handle for a time range of this source.
    pub fn clip_handle(&self, start: f64, end: f64) -> String {
        format!("{}#t={:.2},{:.2}", self.source, start, end)
    }
}
