//! Structured multimodal extraction from video segments.
//!
//! A vision-language model describes each segment; its near-JSON output is
//! repaired into a typed record and attached to the segment.

mod client;
mod enricher;
pub mod repair;

pub use client::{ExtractionClient, OpenAIExtractionClient};
pub use enricher::{EnrichmentOutcome, SegmentEnricher};

use crate::segmentation::Segment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Difficulty of the material covered by a segment.
///
/// `Unknown` is the safe default when extraction or parsing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            "unknown" => Ok(Difficulty::Unknown),
            _ => Err(format!("Unknown difficulty: {}", s)),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
            Difficulty::Unknown => write!(f, "unknown"),
        }
    }
}

/// The structured fields the VLM is asked to produce for a segment.
///
/// All fields default to empty so a partially recovered record is still
/// representable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRecord {
    /// Detailed description of the visuals during this segment.
    pub visual_description: String,
    /// Short summary of what the segment teaches or shows.
    pub cognitive_summary: String,
    /// Ordered technical details (formulas, code, figures).
    pub technical_details: Vec<String>,
    /// Who is speaking, if identifiable.
    pub speaker_info: Option<String>,
    /// Key concepts covered.
    pub key_concepts: BTreeSet<String>,
    /// Difficulty of the material.
    pub difficulty: Difficulty,
}

/// A segment enriched with the extracted multimodal description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedSegment {
    /// The underlying time-bounded segment.
    pub segment: Segment,
    pub visual_description: String,
    pub cognitive_summary: String,
    pub technical_details: Vec<String>,
    pub speaker_info: Option<String>,
    pub key_concepts: BTreeSet<String>,
    pub difficulty: Difficulty,
}

impl EnrichedSegment {
    /// Attach an extraction record to a segment.
    pub fn from_record(segment: Segment, record: ExtractionRecord) -> Self {
        Self {
            segment,
            visual_description: record.visual_description,
            cognitive_summary: record.cognitive_summary,
            technical_details: record.technical_details,
            speaker_info: record.speaker_info,
            key_concepts: record.key_concepts,
            difficulty: record.difficulty,
        }
    }

    /// Empty-field enrichment for a segment whose extraction failed.
    ///
    /// The segment is still indexed on its raw transcript so it is never
    /// silently dropped.
    pub fn degraded(segment: Segment) -> Self {
        Self::from_record(segment, ExtractionRecord::default())
    }

    /// The text that gets embedded and indexed for this segment.
    pub fn document_text(&self) -> String {
        let concepts = self
            .key_concepts
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Timestamp: {}\nTranscript: {}\nVisuals: {}\nSummary: {}\nKey Concepts: {}",
            self.segment.format_timestamp(),
            self.segment.transcript,
            self.visual_description,
            self.cognitive_summary,
            concepts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_segment() -> Segment {
        Segment {
            job_id: Uuid::new_v4(),
            ordinal: 0,
            start_seconds: 75.0,
            end_seconds: 90.0,
            transcript: "the derivative of x squared is 2x".to_string(),
            media_handle: "lecture.mp4#t=75.00,90.00".to_string(),
        }
    }

    #[test]
    fn test_difficulty_roundtrip() {
        let json = serde_json::to_string(&Difficulty::Advanced).unwrap();
        assert_eq!(json, "\"advanced\"");
        let parsed: Difficulty = serde_json::from_str("\"beginner\"").unwrap();
        assert_eq!(parsed, Difficulty::Beginner);
        // Unexpected values fall back to unknown rather than erroring.
        let parsed: Difficulty = serde_json::from_str("\"expert\"").unwrap();
        assert_eq!(parsed, Difficulty::Unknown);
    }

    #[test]
    fn test_degraded_has_unknown_difficulty() {
        let enriched = EnrichedSegment::degraded(test_segment());
        assert_eq!(enriched.difficulty, Difficulty::Unknown);
        assert!(enriched.visual_description.is_empty());
        assert!(enriched.key_concepts.is_empty());
    }

    #[test]
    fn test_document_text_includes_transcript() {
        let enriched = EnrichedSegment::degraded(test_segment());
        let text = enriched.document_text();
        assert!(text.contains("01:15"));
        assert!(text.contains("derivative of x squared"));
    }
}
