//! Job submission and polling.
//!
//! - `POST /api/jobs` (also `/api/start-summary-job/`): upload a recording
//! - `GET /api/jobs/:id` (also `/api/check-job-status/:id/`): poll a job

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::jobs::{job_report, JobId, JobReport, JobStatus, StatusError, LAUNCH_FAILURE_MESSAGE};

/// Multipart field carrying the recording.
pub const UPLOAD_FIELD: &str = "audio_file";

const INVALID_REQUEST: &str = "Invalid request or file missing.";
const MISSING_RESULT: &str = "Job complete, but result data missing.";

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/jobs", post(submit_job))
        .route("/api/jobs/:id", get(job_status))
        .route("/api/start-summary-job/", post(submit_job))
        .route("/api/check-job-status/:id/", get(job_status))
        .with_state(state)
}

/// POST /api/jobs - Accept a recording and start a job.
async fn submit_job(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Rejected upload: {}", e);
        ApiError::bad_request(INVALID_REQUEST)
    })?;

    let (filename, content) = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::bad_request(INVALID_REQUEST)),
            Err(e) => {
                warn!("Failed to read multipart body: {}", e);
                return Err(ApiError::bad_request(format!(
                    "Could not read uploaded file: {}",
                    e
                )));
            }
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        // A plain form value, or a file part with an empty name, is not an upload.
        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                warn!("Rejected upload: {} part has no file name", UPLOAD_FIELD);
                return Err(ApiError::bad_request(INVALID_REQUEST));
            }
        };
        let content = field.bytes().await.map_err(|e| {
            warn!("Failed to read uploaded file {}: {}", filename, e);
            ApiError::bad_request(format!("Could not read uploaded file: {}", e))
        })?;
        break (filename, content);
    };

    info!("Received {} ({} bytes)", filename, content.len());

    let job_id = state
        .queue
        .submit(content.to_vec(), filename)
        .await
        .map_err(|e| {
            error!("Failed to start job: {}", e);
            ApiError::internal(LAUNCH_FAILURE_MESSAGE).with_job_status(JobStatus::Failed)
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": JobStatus::Pending,
            "job_id": job_id,
        })),
    ))
}

/// GET /api/jobs/:id - Current state of a job, with results once complete.
async fn job_status(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobReport>> {
    let not_found = || ApiError::not_found("Job not found.");

    let job_id: JobId = id.parse().map_err(|_| not_found())?;

    match job_report(&state.db, job_id).await {
        Ok(Some(report)) => Ok(Json(report)),
        Ok(None) => Err(not_found()),
        Err(StatusError::MissingResult(id)) => {
            error!("Job {} is complete but has no result", id);
            Err(ApiError::internal(MISSING_RESULT).with_job_status(JobStatus::Failed))
        }
        Err(StatusError::Store(e)) => Err(ApiError::from(e)),
    }
}
