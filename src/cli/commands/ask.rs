//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::JobOrchestrator;
use anyhow::Result;
use uuid::Uuid;

/// Run the ask command against an already ingested video.
pub async fn run_ask(question: &str, job: &str, settings: Settings) -> Result<()> {
    let job_id: Uuid = job
        .parse()
        .map_err(|_| anyhow::anyhow!("'{}' is not a valid job id", job))?;

    let orchestrator = JobOrchestrator::new(settings)?;
    orchestrator.rehydrate().await?;

    let spinner = Output::spinner("Searching the video...");
    let answer = orchestrator.answer(job_id, question).await;
    spinner.finish_and_clear();

    match answer {
        Ok(answer) => {
            println!("\n{}\n", answer.text);
            if !answer.citations.is_empty() {
                Output::header("Referenced timestamps");
                for citation in &answer.citations {
                    Output::citation(citation);
                }
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            Err(e.into())
        }
    }
}
