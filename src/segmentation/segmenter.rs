//! Boundary-based segmentation policy.
//!
//! Cuts at speech pauses in the transcript stream once a segment has reached
//! its minimum span, and force-cuts at the maximum span. Falls back to
//! fixed-length windows when no transcript is available.

use super::Segment;
use crate::error::Result;
use crate::media::{MediaInput, TranscriptSpan};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Configuration for temporal segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Minimum segment span in seconds.
    pub min_span_seconds: f64,
    /// Target segment span in seconds (used for fixed-window fallback).
    pub target_span_seconds: f64,
    /// Maximum segment span in seconds.
    pub max_span_seconds: f64,
    /// Gap between transcript spans treated as a content boundary.
    pub pause_threshold_seconds: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_span_seconds: 5.0,
            target_span_seconds: 15.0,
            max_span_seconds: 30.0,
            pause_threshold_seconds: 0.75,
        }
    }
}

/// Split decoded media into ordered, non-overlapping segments.
///
/// Fails with `MediaUnreadable` when the manifest describes media the
/// collaborator could not decode.
pub fn segment_media(
    job_id: Uuid,
    media: &MediaInput,
    config: &SegmentationConfig,
) -> Result<Vec<Segment>> {
    media.validate()?;

    let segments = if media.transcript.is_empty() {
        fixed_windows(job_id, media, config)
    } else {
        boundary_windows(job_id, media, config)
    };

    debug!(
        "Segmented '{}' ({:.0}s) into {} segments",
        media.source,
        media.duration_seconds,
        segments.len()
    );
    Ok(segments)
}

/// Fixed-length fallback when no boundary signal is available.
fn fixed_windows(job_id: Uuid, media: &MediaInput, config: &SegmentationConfig) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut start = 0.0;
    let mut ordinal = 0u32;

    while start < media.duration_seconds {
        let end = (start + config.target_span_seconds).min(media.duration_seconds);
        segments.push(Segment {
            job_id,
            ordinal,
            start_seconds: start,
            end_seconds: end,
            transcript: String::new(),
            media_handle: media.clip_handle(start, end),
        });
        ordinal += 1;
        start = end;
    }

    segments
}

/// Cut along transcript pauses, honoring the min/max span bounds.
fn boundary_windows(job_id: Uuid, media: &MediaInput, config: &SegmentationConfig) -> Vec<Segment> {
    let mut spans: Vec<&TranscriptSpan> = media.transcript.iter().collect();
    spans.sort_by(|a, b| {
        a.start_seconds
            .partial_cmp(&b.start_seconds)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut segments: Vec<Segment> = Vec::new();
    let mut open_start: f64 = 0.0;
    let mut open_texts: Vec<&str> = Vec::new();
    let mut open_end: f64 = 0.0;

    let close = |start: f64, end: f64, texts: &mut Vec<&str>, segments: &mut Vec<Segment>| {
        if end <= start {
            return;
        }
        // A single transcript span can exceed the maximum on its own, so an
        // over-long stretch is windowed down here. Word timing inside a span
        // is unknown; the transcript rides the first window.
        let mut transcript = Some(texts.join(" ").trim().to_string());
        texts.clear();
        let mut window_start = start;
        while window_start < end {
            let window_end = if end - window_start > config.max_span_seconds {
                window_start + config.target_span_seconds
            } else {
                end
            };
            let ordinal = segments.len() as u32;
            segments.push(Segment {
                job_id,
                ordinal,
                start_seconds: window_start,
                end_seconds: window_end,
                transcript: transcript.take().unwrap_or_default(),
                media_handle: media.clip_handle(window_start, window_end),
            });
            window_start = window_end;
        }
    };

    for (i, span) in spans.iter().enumerate() {
        // Never let spans overlap a previous cut point.
        let span_start = span.start_seconds.max(open_end);
        let span_end = span.end_seconds.min(media.duration_seconds).max(span_start);

        // Force a cut if adding this span would blow past the maximum.
        if !open_texts.is_empty() && span_end - open_start > config.max_span_seconds {
            close(open_start, open_end, &mut open_texts, &mut segments);
            open_start = open_end;
        }

        open_texts.push(span.text.as_str());
        open_end = span_end;

        // Cut at a pause boundary once the segment is long enough.
        let at_boundary = match spans.get(i + 1) {
            Some(next) => next.start_seconds - span.end_seconds >= config.pause_threshold_seconds,
            None => true,
        };
        if at_boundary && open_end - open_start >= config.min_span_seconds {
            close(open_start, open_end, &mut open_texts, &mut segments);
            open_start = open_end;
        }
    }

    // Whatever is left open belongs to the last segment, even if short.
    if !open_texts.is_empty() {
        close(open_start, open_end, &mut open_texts, &mut segments);
    }

    // Trailing silence past the last span is still part of the video.
    if let Some(last) = segments.last() {
        let mut start = last.end_seconds;
        while media.duration_seconds - start >= config.min_span_seconds {
            let end = (start + config.target_span_seconds).min(media.duration_seconds);
            let ordinal = segments.len() as u32;
            segments.push(Segment {
                job_id,
                ordinal,
                start_seconds: start,
                end_seconds: end,
                transcript: String::new(),
                media_handle: media.clip_handle(start, end),
            });
            start = end;
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TranscriptSpan;

    fn span(start: f64, end: f64, text: &str) -> TranscriptSpan {
        TranscriptSpan {
            start_seconds: start,
            end_seconds: end,
            text: text.to_string(),
        }
    }

    fn assert_well_formed(segments: &[Segment]) {
        for (i, seg) in segments.iter().enumerate() {
            assert!(seg.start_seconds < seg.end_seconds, "segment {} inverted", i);
            assert_eq!(seg.ordinal, i as u32);
            if i > 0 {
                assert!(
                    seg.start_seconds >= segments[i - 1].end_seconds,
                    "segment {} overlaps previous",
                    i
                );
            }
        }
    }

    #[test]
    fn test_fixed_fallback_without_transcript() {
        let media = MediaInput {
            source: "silent.mp4".to_string(),
            duration_seconds: 47.0,
            transcript: vec![],
        };
        let segments =
            segment_media(Uuid::new_v4(), &media, &SegmentationConfig::default()).unwrap();

        assert_well_formed(&segments);
        assert_eq!(segments.len(), 4); // 15 + 15 + 15 + 2
        assert_eq!(segments[3].end_seconds, 47.0);
        assert!(segments.iter().all(|s| s.transcript.is_empty()));
    }

    #[test]
    fn test_cuts_at_pause_boundaries() {
        let media = MediaInput {
            source: "talk.mp4".to_string(),
            duration_seconds: 30.0,
            transcript: vec![
                span(0.0, 4.0, "First idea"),
                span(4.2, 8.0, "continues here."),
                // Two-second pause: a content boundary.
                span(10.0, 14.0, "Second idea"),
                span(14.1, 18.0, "wraps up."),
            ],
        };
        let segments =
            segment_media(Uuid::new_v4(), &media, &SegmentationConfig::default()).unwrap();

        assert_well_formed(&segments);
        assert!(segments.len() >= 2);
        assert_eq!(segments[0].transcript, "First idea continues here.");
        assert!(segments[1].transcript.starts_with("Second idea"));
    }

    #[test]
    fn test_max_span_forces_cut() {
        // Continuous speech with no pauses must still respect the max span.
        let spans: Vec<TranscriptSpan> = (0..20)
            .map(|i| span(i as f64 * 4.0, i as f64 * 4.0 + 4.0, "word"))
            .collect();
        let media = MediaInput {
            source: "marathon.mp4".to_string(),
            duration_seconds: 80.0,
            transcript: spans,
        };
        let segments =
            segment_media(Uuid::new_v4(), &media, &SegmentationConfig::default()).unwrap();

        assert_well_formed(&segments);
        for seg in &segments {
            assert!(seg.duration() <= 30.0 + f64::EPSILON, "segment too long");
        }
    }

    #[test]
    fn test_single_long_span_windowed_to_max() {
        // One uninterrupted 40s span offers no pause to cut at.
        let media = MediaInput {
            source: "monologue.mp4".to_string(),
            duration_seconds: 40.0,
            transcript: vec![span(0.0, 40.0, "one uninterrupted take")],
        };
        let segments =
            segment_media(Uuid::new_v4(), &media, &SegmentationConfig::default()).unwrap();

        assert_well_formed(&segments);
        for seg in &segments {
            assert!(
                seg.duration() <= 30.0 + f64::EPSILON,
                "segment {} is {}s",
                seg.ordinal,
                seg.duration()
            );
        }
        assert_eq!(segments.last().unwrap().end_seconds, 40.0);
        assert_eq!(segments[0].transcript, "one uninterrupted take");
    }

    #[test]
    fn test_unreadable_media_rejected() {
        let media = MediaInput {
            source: "broken.mp4".to_string(),
            duration_seconds: f64::NAN,
            transcript: vec![],
        };
        let result = segment_media(Uuid::new_v4(), &media, &SegmentationConfig::default());
        assert!(result.is_err());
    }
}
