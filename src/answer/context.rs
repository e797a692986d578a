//! Prompt context assembly from retrieved segments.

use crate::retrieval::RetrievedContext;
use crate::vector_store::SearchHit;
use tracing::debug;

/// One context entry handed to the answer model, keyed by its citation
/// timestamp.
#[derive(Debug, Clone)]
pub struct ContextEntry {
    /// Formatted start timestamp, the citation key.
    pub citation: String,
    /// Segment start in seconds, for ordering.
    pub start_seconds: f64,
    /// Similarity score the entry was retrieved with.
    pub score: f32,
    /// Rendered text block for the prompt.
    pub text: String,
}

/// Assembled, chronologically ordered context for one query.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub entries: Vec<ContextEntry>,
}

impl PromptContext {
    /// No usable context; the caller should take the not-found answer path.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the entries as the prompt's context block.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("---\n[{}]\n{}\n---", e.citation, e.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Citation keys in chronological order.
    pub fn citations(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.citation.clone()).collect()
    }
}

/// Turns ranked retrieval hits into a prompt context.
pub struct ContextAssembler {
    relevance_floor: f32,
}

impl ContextAssembler {
    pub fn new(relevance_floor: f32) -> Self {
        Self { relevance_floor }
    }

    /// Assemble a prompt context from ranked hits.
    ///
    /// Hits below the relevance floor are dropped. A hit whose non-empty
    /// concept set is identical to an already-kept one adds nothing and is
    /// dropped too (rank order decides which survives). The result is
    /// reordered chronologically so the model reads the video in sequence.
    pub fn assemble(&self, retrieved: &RetrievedContext) -> PromptContext {
        let mut kept: Vec<&SearchHit> = Vec::new();

        for hit in &retrieved.hits {
            if hit.score < self.relevance_floor {
                continue;
            }
            let duplicate = !hit.segment.key_concepts.is_empty()
                && kept
                    .iter()
                    .any(|k| k.segment.key_concepts == hit.segment.key_concepts);
            if duplicate {
                debug!(
                    "Dropping {} as concept-duplicate context",
                    hit.segment.segment.doc_id()
                );
                continue;
            }
            kept.push(hit);
        }

        let mut entries: Vec<ContextEntry> = kept
            .into_iter()
            .map(|hit| ContextEntry {
                citation: hit.segment.segment.format_timestamp(),
                start_seconds: hit.segment.segment.start_seconds,
                score: hit.score,
                text: hit.segment.document_text(),
            })
            .collect();

        entries.sort_by(|a, b| {
            a.start_seconds
                .partial_cmp(&b.start_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        PromptContext { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{EnrichedSegment, ExtractionRecord};
    use crate::segmentation::Segment;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn hit(ordinal: u32, start: f64, score: f32, concepts: &[&str]) -> SearchHit {
        let segment = Segment {
            job_id: Uuid::nil(),
            ordinal,
            start_seconds: start,
            end_seconds: start + 10.0,
            transcript: format!("transcript {}", ordinal),
            media_handle: format!("v.mp4#t={:.2},{:.2}", start, start + 10.0),
        };
        let record = ExtractionRecord {
            key_concepts: concepts.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
            ..Default::default()
        };
        SearchHit {
            segment: EnrichedSegment::from_record(segment, record),
            score,
        }
    }

    #[test]
    fn test_below_floor_dropped() {
        let assembler = ContextAssembler::new(0.3);
        let retrieved = RetrievedContext {
            hits: vec![hit(0, 0.0, 0.8, &["a"]), hit(1, 10.0, 0.1, &["b"])],
        };
        let ctx = assembler.assemble(&retrieved);
        assert_eq!(ctx.entries.len(), 1);
        assert_eq!(ctx.entries[0].citation, "00:00");
    }

    #[test]
    fn test_duplicate_concepts_deduped_empty_sets_kept() {
        let assembler = ContextAssembler::new(0.0);
        let retrieved = RetrievedContext {
            hits: vec![
                hit(0, 0.0, 0.9, &["gradient", "descent"]),
                hit(1, 30.0, 0.8, &["gradient", "descent"]),
                hit(2, 60.0, 0.7, &[]),
                hit(3, 90.0, 0.6, &[]),
            ],
        };
        let ctx = assembler.assemble(&retrieved);
        // Second concept-identical hit dropped; empty sets never match.
        assert_eq!(ctx.entries.len(), 3);
        assert_eq!(ctx.citations(), vec!["00:00", "01:00", "01:30"]);
    }

    #[test]
    fn test_chronological_order() {
        let assembler = ContextAssembler::new(0.0);
        let retrieved = RetrievedContext {
            hits: vec![hit(2, 120.0, 0.9, &["c"]), hit(0, 5.0, 0.8, &["a"])],
        };
        let ctx = assembler.assemble(&retrieved);
        assert_eq!(ctx.citations(), vec!["00:05", "02:00"]);
    }

    #[test]
    fn test_all_below_floor_is_empty_but_valid() {
        let assembler = ContextAssembler::new(0.5);
        let retrieved = RetrievedContext {
            hits: vec![hit(0, 0.0, 0.2, &["a"])],
        };
        let ctx = assembler.assemble(&retrieved);
        assert!(ctx.is_empty());
        assert!(ctx.render().is_empty());
    }
}
