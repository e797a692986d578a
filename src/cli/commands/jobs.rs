//! Jobs command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::JobOrchestrator;
use anyhow::Result;

/// Run the jobs command: list everything in the durable index.
pub async fn run_jobs(settings: Settings) -> Result<()> {
    let orchestrator = JobOrchestrator::new(settings)?;

    match orchestrator.vector_store().list_jobs().await {
        Ok(jobs) => {
            if jobs.is_empty() {
                Output::info("No videos indexed yet. Use 'sikt ingest <manifest>' to add one.");
            } else {
                Output::header(&format!("Indexed Videos ({})", jobs.len()));
                println!();

                for job in &jobs {
                    Output::job_info(
                        &job.source,
                        &job.job_id.to_string(),
                        job.entry_count,
                        job.total_duration_seconds,
                    );
                }

                let total_segments: u32 = jobs.iter().map(|j| j.entry_count).sum();
                println!();
                Output::kv("Total videos", &jobs.len().to_string());
                Output::kv("Total segments", &total_segments.to_string());
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            Err(e.into())
        }
    }
}
