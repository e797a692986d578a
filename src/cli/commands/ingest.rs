//! Ingest command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::media::MediaInput;
use crate::orchestrator::{JobOrchestrator, JobStatus};
use anyhow::Result;
use std::path::Path;

/// Run the ingest command: process a manifest inline, optionally answering a
/// question right away.
pub async fn run_ingest(
    manifest: &str,
    question: Option<String>,
    settings: Settings,
) -> Result<()> {
    let media = MediaInput::from_file(Path::new(manifest))?;
    Output::info(&format!(
        "Ingesting {} ({:.0}s, {} transcript spans)",
        media.source,
        media.duration_seconds,
        media.transcript.len()
    ));

    let orchestrator = JobOrchestrator::new(settings)?;
    orchestrator.rehydrate().await?;

    let spinner = Output::spinner("Segmenting, describing, and indexing...");
    let job = orchestrator.process(media).await;
    spinner.finish_and_clear();

    let job = match job {
        Ok(job) => job,
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            return Err(e.into());
        }
    };

    match job.status {
        JobStatus::Completed => {
            Output::success(&format!(
                "Job {} completed: {}",
                job.id,
                job.message.as_deref().unwrap_or("indexed")
            ));
        }
        _ => {
            Output::error(&format!(
                "Job {} finished as {}: {}",
                job.id,
                job.status,
                job.message.as_deref().unwrap_or("no detail")
            ));
            anyhow::bail!("ingestion did not complete");
        }
    }

    if let Some(question) = question {
        let spinner = Output::spinner("Answering...");
        let answer = orchestrator.answer(job.id, &question).await;
        spinner.finish_and_clear();

        match answer {
            Ok(answer) => {
                println!("\n{}\n", answer.text);
                for citation in &answer.citations {
                    Output::citation(citation);
                }
            }
            Err(e) => {
                Output::error(&format!("Failed to answer: {}", e));
                return Err(e.into());
            }
        }
    } else {
        Output::info(&format!(
            "Ask about it with: sikt ask --job {} \"your question\"",
            job.id
        ));
    }

    Ok(())
}
