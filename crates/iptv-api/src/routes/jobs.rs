use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use iptv_core::{Report, Summary};

use super::PlaylistCheckRequest;
use crate::error::ApiError;
use crate::state::{AppState, Job, JobState};

#[derive(Serialize)]
pub struct CreateJobResponse {
    pub id: Uuid,
    pub state: JobState,
}

#[derive(Serialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub state: JobState,
    pub input_kind: &'static str,
    pub created_at: String,
    pub finished_at: Option<String>,
    pub summary: Option<Summary>,
}

#[derive(Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub summary: JobSummary,
    pub error: Option<String>,
    pub report: Option<Arc<Report>>,
}

#[derive(Serialize)]
pub struct DeleteJobResponse {
    pub message: String,
    pub id: Uuid,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job).get(list_jobs))
        .route("/jobs/{id}", get(get_job).delete(delete_job))
}

fn parse_job_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::BadRequest(format!("Invalid job ID: {}", id)))
}

fn summarize(job: &Job) -> JobSummary {
    JobSummary {
        id: job.id,
        state: job.state,
        input_kind: job.input_kind,
        created_at: job.created_at.to_rfc3339(),
        finished_at: job.finished_at.map(|t| t.to_rfc3339()),
        summary: job.report.as_ref().map(|r| r.summary()),
    }
}

/// POST /api/v1/jobs
async fn create_job(
    State(state): State<AppState>,
    Json(body): Json<PlaylistCheckRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = body.playlist_input(&state)?;
    let options = body.options();

    let job = Job::new(input.kind());
    let id = job.id;
    state.jobs.insert(id, job);

    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        let result = task_state.checker.check_playlist(input, options).await;
        {
            let Some(mut job) = task_state.jobs.get_mut(&id) else {
                return;
            };
            match result {
                Ok(report) => {
                    task_state.metrics.record_report(&report);
                    info!(job_id = %id, items = report.items.len(), "Playlist job completed");
                    job.complete(report);
                }
                Err(e) => {
                    task_state.metrics.record_playlist_error(&e);
                    warn!(job_id = %id, error = %e, "Playlist job failed");
                    job.fail(e.to_string());
                }
            }
        }
        // The entry guard above must be released before pruning walks the map.
        let evicted = task_state.prune_finished_jobs();
        if evicted > 0 {
            debug!(evicted, "Evicted finished jobs");
        }
    });

    if let Some(mut job) = state.jobs.get_mut(&id) {
        if job.state == JobState::Running {
            job.abort = Some(handle.abort_handle());
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateJobResponse {
            id,
            state: JobState::Running,
        }),
    ))
}

/// GET /api/v1/jobs
async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobSummary>> {
    let mut jobs: Vec<JobSummary> = state.jobs.iter().map(|j| summarize(j.value())).collect();
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(jobs)
}

/// GET /api/v1/jobs/:id
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobDetail>, ApiError> {
    let id = parse_job_id(&id)?;
    let job = state
        .jobs
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    Ok(Json(JobDetail {
        summary: summarize(&job),
        error: job.error.clone(),
        report: job.report.clone(),
    }))
}

/// DELETE /api/v1/jobs/:id
async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteJobResponse>, ApiError> {
    let id = parse_job_id(&id)?;
    let (_, job) = state
        .jobs
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    let message = match job.abort {
        Some(abort) => {
            abort.abort();
            "Job cancelled and deleted"
        }
        None => "Job deleted",
    };

    Ok(Json(DeleteJobResponse {
        message: message.into(),
        id,
    }))
}
