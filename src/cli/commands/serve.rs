//! HTTP API server for integration with player and voice collaborators.
//!
//! Exposes video submission, job polling, and grounded question answering.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::SiktError;
use crate::media::MediaInput;
use crate::orchestrator::JobOrchestrator;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

/// Shared application state.
struct AppState {
    orchestrator: Arc<JobOrchestrator>,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let orchestrator = Arc::new(JobOrchestrator::new(settings)?);
    orchestrator.rehydrate().await?;

    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/videos", post(submit_video))
        .route("/videos/{job_id}", get(video_status).delete(cancel_video))
        .route("/query", post(query))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Sikt API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Submit video", "POST   /videos");
    Output::kv("Job status", "GET    /videos/:job_id");
    Output::kv("Cancel job", "DELETE /videos/:job_id");
    Output::kv("Ask (RAG)", "POST   /query");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Serialize)]
struct SubmitResponse {
    job_id: Uuid,
    status: String,
}

#[derive(Serialize)]
struct StatusResponse {
    job_id: Uuid,
    source: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Deserialize)]
struct QueryRequest {
    job_id: Uuid,
    question: String,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    referenced_timestamps: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: SiktError) -> axum::response::Response {
    let status = match &e {
        SiktError::JobNotFound(_) => StatusCode::NOT_FOUND,
        SiktError::JobNotReady { .. } => StatusCode::CONFLICT,
        SiktError::MediaUnreadable(_) | SiktError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn submit_video(
    State(state): State<Arc<AppState>>,
    Json(input): Json<MediaInput>,
) -> impl IntoResponse {
    match state.orchestrator.clone().submit(input) {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                job_id,
                status: "pending".to_string(),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn video_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.orchestrator.status(job_id) {
        Ok(job) => Json(StatusResponse {
            job_id: job.id,
            source: job.source,
            status: job.status.to_string(),
            message: job.message,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn cancel_video(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.orchestrator.cancel(job_id).await {
        Ok(job) => Json(StatusResponse {
            job_id: job.id,
            source: job.source,
            status: job.status.to_string(),
            message: job.message,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    match state.orchestrator.answer(req.job_id, &req.question).await {
        Ok(answer) => Json(QueryResponse {
            answer: answer.text,
            referenced_timestamps: answer.citations,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
