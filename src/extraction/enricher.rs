//! Segment enrichment: extraction + repair under the retry policy.

use super::repair;
use super::{EnrichedSegment, ExtractionClient};
use crate::retry::{with_backoff, RetryPolicy};
use crate::segmentation::Segment;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of enriching a job's segment sequence.
#[derive(Debug)]
pub struct EnrichmentOutcome {
    /// One enriched segment per input segment, in ordinal order.
    pub segments: Vec<EnrichedSegment>,
    /// Segments whose extraction call failed outright (empty-field records).
    pub degraded: usize,
}

impl EnrichmentOutcome {
    /// Whether every single segment's extraction call failed.
    pub fn total_failure(&self) -> bool {
        !self.segments.is_empty() && self.degraded == self.segments.len()
    }
}

/// Drives extraction and repair per segment.
///
/// Per-segment failure is isolated: exhausted retries or a permanent failure
/// degrade that segment to an empty-field record rather than aborting the
/// job.
pub struct SegmentEnricher {
    client: Arc<dyn ExtractionClient>,
    policy: RetryPolicy,
    max_concurrent: usize,
}

impl SegmentEnricher {
    /// Create an enricher over an extraction client.
    pub fn new(client: Arc<dyn ExtractionClient>, policy: RetryPolicy, max_concurrent: usize) -> Self {
        Self {
            client,
            policy,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Enrich a single segment. Infallible by policy: extraction failure
    /// yields a degraded record, never an error.
    #[instrument(skip(self, segment), fields(doc_id = %segment.doc_id()))]
    pub async fn enrich(&self, segment: &Segment) -> (EnrichedSegment, bool) {
        let raw = with_backoff(&self.policy, || self.client.extract(segment)).await;

        match raw {
            Ok(retried) => {
                let parsed = repair::parse(&retried.value);
                if !parsed.repairs.is_empty() {
                    info!(
                        "Repaired extraction output for {} ({:?}, first failure at {:?})",
                        segment.doc_id(),
                        parsed.repairs,
                        parsed.failure
                    );
                }
                (EnrichedSegment::from_record(segment.clone(), parsed.record), false)
            }
            Err(e) => {
                warn!(
                    "Extraction failed for {}, indexing degraded record: {}",
                    segment.doc_id(),
                    e
                );
                (EnrichedSegment::degraded(segment.clone()), true)
            }
        }
    }

    /// Enrich all segments of a job with bounded concurrency.
    ///
    /// Extraction calls for different segments are independent; the worker
    /// pool bound respects external rate limits. Results come back in
    /// ordinal order regardless of completion order.
    #[instrument(skip(self, segments), fields(count = segments.len()))]
    pub async fn enrich_all(&self, segments: &[Segment]) -> EnrichmentOutcome {
        let mut enriched: Vec<(EnrichedSegment, bool)> = stream::iter(segments.to_vec())
            .map(|segment| async move { self.enrich(&segment).await })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        enriched.sort_by_key(|(e, _)| e.segment.ordinal);

        let degraded = enriched.iter().filter(|(_, d)| *d).count();
        if degraded > 0 {
            warn!("{}/{} segments degraded during enrichment", degraded, enriched.len());
        }

        EnrichmentOutcome {
            segments: enriched.into_iter().map(|(e, _)| e).collect(),
            degraded,
        }
    }
}
