//! Sikt - Video Knowledge Base and RAG
//!
//! Turns videos into a queryable knowledge base.
//!
//! The name "Sikt" comes from the Norwegian word for "sight."
//!
//! # Overview
//!
//! Sikt allows you to:
//! - Segment a video in time along natural content boundaries
//! - Extract structured multimodal descriptions per segment with a
//!   vision-language model, tolerating malformed model output
//! - Index the enriched segments for semantic retrieval
//! - Ask questions and get grounded answers with timestamp citations
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt management
//! - `media` - Decoded-media manifest (the ingestion collaborator contract)
//! - `segmentation` - Temporal segmentation and the segment store
//! - `extraction` - VLM extraction, JSON repair, segment enrichment
//! - `embedding` - Embedding generation
//! - `vector_store` - Job-scoped vector index abstraction
//! - `retrieval` - Query-time retrieval
//! - `answer` - Context assembly and grounded answer generation
//! - `orchestrator` - Per-video job state machine
//!
//! # Example
//!
//! ```rust,no_run
//! use sikt::config::Settings;
//! use sikt::media::MediaInput;
//! use sikt::orchestrator::JobOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = JobOrchestrator::new(settings)?;
//!
//!     let media = MediaInput::from_file("lecture.json".as_ref())?;
//!     let job = orchestrator.process(media).await?;
//!     println!("Job {} finished as {}", job.id, job.status);
//!
//!     let answer = orchestrator.answer(job.id, "What is the power rule?").await?;
//!     println!("{}", answer.text);
//!
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extraction;
pub mod media;
pub mod openai;
pub mod orchestrator;
pub mod retrieval;
pub mod retry;
pub mod segmentation;
pub mod vector_store;

pub use error::{Result, SiktError};
