//! Job orchestration: the ingestion state machine and the query path.
//!
//! Owns the job table and every shared pipeline component. Ingestion runs
//! sequentially per job (segment, enrich, embed, index) while queries against
//! completed jobs run concurrently with ingestion of other jobs.

use crate::answer::{
    Answer, AnswerGenerator, AnswerModel, ContextAssembler, OpenAIAnswerModel, QueryPhase,
};
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{Result, SiktError};
use crate::extraction::{ExtractionClient, OpenAIExtractionClient, SegmentEnricher};
use crate::media::MediaInput;
use crate::retrieval::Retriever;
use crate::retry::RetryPolicy;
use crate::segmentation::SegmentStore;
use crate::vector_store::{IndexedEntry, IndexedJob, SqliteVectorStore, VectorStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Lifecycle state of an ingestion job. Transitions only move forward;
/// `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    ProcessingVideo,
    IndexingData,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::ProcessingVideo => "processing_video",
            JobStatus::IndexingData => "indexing_data",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// An ingestion job as exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJob {
    pub id: Uuid,
    pub source: String,
    pub status: JobStatus,
    /// Human-readable progress or failure detail.
    pub message: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Coordinates ingestion jobs and answers queries against completed ones.
pub struct JobOrchestrator {
    settings: Settings,
    jobs: RwLock<HashMap<Uuid, VideoJob>>,
    segment_store: SegmentStore,
    enricher: SegmentEnricher,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    retriever: Retriever,
    assembler: ContextAssembler,
    generator: AnswerGenerator,
}

impl JobOrchestrator {
    /// Create an orchestrator backed by the OpenAI clients and the sqlite
    /// index from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let extraction_client: Arc<dyn ExtractionClient> = Arc::new(OpenAIExtractionClient::new(
            &settings.extraction.model,
            prompts.clone(),
        ));
        let answer_model: Arc<dyn AnswerModel> =
            Arc::new(OpenAIAnswerModel::new(&settings.answer.model));
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));
        let vector_store: Arc<dyn VectorStore> =
            Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);

        Ok(Self::with_components(
            settings,
            prompts,
            extraction_client,
            answer_model,
            embedder,
            vector_store,
        ))
    }

    /// Create an orchestrator from explicit components (tests, alternative
    /// backends).
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        extraction_client: Arc<dyn ExtractionClient>,
        answer_model: Arc<dyn AnswerModel>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        let extraction_policy = RetryPolicy::from_millis(
            settings.extraction.max_attempts,
            settings.extraction.base_delay_ms,
            settings.extraction.max_delay_ms,
        );
        let answer_policy = RetryPolicy::from_millis(
            settings.answer.max_attempts,
            settings.answer.base_delay_ms,
            settings.answer.max_delay_ms,
        );

        let enricher = SegmentEnricher::new(
            extraction_client,
            extraction_policy,
            settings.extraction.max_concurrent_calls,
        );
        let retriever = Retriever::new(
            embedder.clone(),
            vector_store.clone(),
            settings.retrieval.clone(),
        );
        let assembler = ContextAssembler::new(settings.retrieval.relevance_floor);
        let generator = AnswerGenerator::new(answer_model, prompts, answer_policy);
        let segment_store = SegmentStore::new(settings.segmentation.clone());

        Self {
            settings,
            jobs: RwLock::new(HashMap::new()),
            segment_store,
            enricher,
            embedder,
            vector_store,
            retriever,
            assembler,
            generator,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Register jobs already present in the durable index as completed.
    ///
    /// Run once at startup so previously ingested videos stay queryable
    /// across restarts.
    pub async fn rehydrate(&self) -> Result<usize> {
        let indexed: Vec<IndexedJob> = self.vector_store.list_jobs().await?;
        let mut jobs = self.lock_jobs_mut()?;
        let mut restored = 0;
        for summary in indexed {
            jobs.entry(summary.job_id).or_insert_with(|| {
                restored += 1;
                VideoJob {
                    id: summary.job_id,
                    source: summary.source.clone(),
                    status: JobStatus::Completed,
                    message: Some(format!("{} segments indexed", summary.entry_count)),
                    submitted_at: summary.indexed_at,
                }
            });
        }
        if restored > 0 {
            info!("Rehydrated {} completed job(s) from the index", restored);
        }
        Ok(restored)
    }

    /// Submit a video for background ingestion. Returns immediately with the
    /// job id; poll with [`status`](Self::status).
    pub fn submit(self: Arc<Self>, input: MediaInput) -> Result<Uuid> {
        input.validate()?;
        let job_id = self.register_job(&input.source)?;

        let orchestrator = self;
        tokio::spawn(async move {
            orchestrator.run_pipeline(job_id, input).await;
        });

        Ok(job_id)
    }

    /// Run the ingestion pipeline inline and return the finished job.
    pub async fn process(&self, input: MediaInput) -> Result<VideoJob> {
        input.validate()?;
        let job_id = self.register_job(&input.source)?;
        self.run_pipeline(job_id, input).await;
        self.status(job_id)
    }

    /// Current state of a job.
    pub fn status(&self, job_id: Uuid) -> Result<VideoJob> {
        let jobs = self.lock_jobs()?;
        jobs.get(&job_id)
            .cloned()
            .ok_or(SiktError::JobNotFound(job_id))
    }

    /// Snapshot of all known jobs, most recent first.
    pub fn jobs(&self) -> Result<Vec<VideoJob>> {
        let jobs = self.lock_jobs()?;
        let mut all: Vec<VideoJob> = jobs.values().cloned().collect();
        all.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(all)
    }

    /// Cancel a job. Terminal jobs are left untouched; a cancelled job's
    /// partial index writes are purged so it is never queryable.
    #[instrument(skip(self))]
    pub async fn cancel(&self, job_id: Uuid) -> Result<VideoJob> {
        let cancelled = {
            let mut jobs = self.lock_jobs_mut()?;
            let job = jobs
                .get_mut(&job_id)
                .ok_or(SiktError::JobNotFound(job_id))?;
            if job.status.is_terminal() {
                return Ok(job.clone());
            }
            job.status = JobStatus::Cancelled;
            job.message = Some("Cancelled by request".to_string());
            job.clone()
        };

        self.vector_store.purge_job(job_id).await?;
        self.segment_store.remove(job_id);
        info!("Cancelled job {}", job_id);
        Ok(cancelled)
    }

    /// Answer a question against a completed job's index.
    #[instrument(skip(self, question), fields(job_id = %job_id))]
    pub async fn answer(&self, job_id: Uuid, question: &str) -> Result<Answer> {
        debug!(phase = %QueryPhase::Received, "Query received");

        let job = self.status(job_id)?;
        if job.status != JobStatus::Completed {
            return Err(SiktError::JobNotReady {
                job_id,
                status: job.status.to_string(),
            });
        }

        debug!(phase = %QueryPhase::Embedding, "Embedding query");
        debug!(phase = %QueryPhase::Retrieving, "Searching index");
        let retrieved = self.retriever.retrieve(job_id, question).await?;

        debug!(phase = %QueryPhase::Assembling, "Assembling context");
        let context = self.assembler.assemble(&retrieved);

        debug!(phase = %QueryPhase::Generating, "Generating answer");
        let result = self.generator.generate(question, &context).await;

        match &result {
            Ok(answer) => {
                debug!(phase = %QueryPhase::Done, citations = answer.citations.len(), "Query done")
            }
            Err(e) => warn!(phase = %QueryPhase::Failed, "Query failed: {}", e),
        }
        result
    }

    /// The full ingestion state machine for one job. Never returns an error:
    /// failures land in the job table as `Failed` with a message.
    #[instrument(skip(self, input), fields(job_id = %job_id, source = %input.source))]
    async fn run_pipeline(&self, job_id: Uuid, input: MediaInput) {
        if let Err(e) = self.ingest(job_id, &input).await {
            warn!("Job {} failed: {}", job_id, e);
            self.fail_job(job_id, &e.to_string());
            if let Err(purge_err) = self.vector_store.purge_job(job_id).await {
                warn!("Failed to purge entries of failed job {}: {}", job_id, purge_err);
            }
            self.segment_store.remove(job_id);
        }
    }

    async fn ingest(&self, job_id: Uuid, input: &MediaInput) -> Result<()> {
        if !self.transition(job_id, JobStatus::ProcessingVideo, None)? {
            return Ok(());
        }

        let segments = self.segment_store.create_segments(job_id, input)?;
        info!("Segmented {} into {} segments", input.source, segments.len());

        let outcome = self.enricher.enrich_all(&segments).await;
        if outcome.total_failure() {
            return Err(SiktError::Permanent(
                "no usable segments: every extraction failed".to_string(),
            ));
        }

        if !self.transition(job_id, JobStatus::IndexingData, None)? {
            // Cancelled mid-flight; nothing indexed yet.
            self.segment_store.remove(job_id);
            return Ok(());
        }

        let texts: Vec<String> = outcome
            .segments
            .iter()
            .map(|s| s.document_text())
            .collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let entries: Vec<IndexedEntry> = outcome
            .segments
            .into_iter()
            .zip(embeddings)
            .map(|(segment, embedding)| IndexedEntry::new(segment, embedding))
            .collect();

        self.vector_store.add_batch(&entries).await?;

        let message = if outcome.degraded > 0 {
            format!(
                "{} segments indexed ({} with degraded descriptions)",
                entries.len(),
                outcome.degraded
            )
        } else {
            format!("{} segments indexed", entries.len())
        };

        if !self.transition(job_id, JobStatus::Completed, Some(message))? {
            // Cancelled between the index write and completion; undo it.
            self.vector_store.purge_job(job_id).await?;
            self.segment_store.remove(job_id);
        }
        Ok(())
    }

    fn register_job(&self, source: &str) -> Result<Uuid> {
        let job = VideoJob {
            id: Uuid::new_v4(),
            source: source.to_string(),
            status: JobStatus::Pending,
            message: None,
            submitted_at: Utc::now(),
        };
        let job_id = job.id;
        self.lock_jobs_mut()?.insert(job_id, job);
        info!("Registered job {} for {}", job_id, source);
        Ok(job_id)
    }

    /// Advance a job. Returns `false` without touching the job when it has
    /// already reached a terminal state (cancellation checkpoint).
    fn transition(
        &self,
        job_id: Uuid,
        status: JobStatus,
        message: Option<String>,
    ) -> Result<bool> {
        let mut jobs = self.lock_jobs_mut()?;
        let job = jobs
            .get_mut(&job_id)
            .ok_or(SiktError::JobNotFound(job_id))?;
        if job.status.is_terminal() {
            debug!("Job {} is {}, skipping transition to {}", job_id, job.status, status);
            return Ok(false);
        }
        debug!("Job {}: {} -> {}", job_id, job.status, status);
        job.status = status;
        job.message = message;
        Ok(true)
    }

    fn fail_job(&self, job_id: Uuid, message: &str) {
        if let Ok(mut jobs) = self.jobs.write() {
            if let Some(job) = jobs.get_mut(&job_id) {
                if !job.status.is_terminal() {
                    job.status = JobStatus::Failed;
                    job.message = Some(message.to_string());
                }
            }
        }
    }

    fn lock_jobs(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, VideoJob>>> {
        self.jobs
            .read()
            .map_err(|e| SiktError::Internal(format!("Job table lock poisoned: {}", e)))
    }

    fn lock_jobs_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, VideoJob>>> {
        self.jobs
            .write()
            .map_err(|e| SiktError::Internal(format!("Job table lock poisoned: {}", e)))
    }
}
