//! Completed meetings.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::api::ApiState;
use crate::db::{MeetingListing, MeetingRepository};
use crate::jobs::JobId;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Deserialize, Default)]
pub struct MeetingQueryParams {
    /// Maximum results (default 20)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MeetingSummaryItem {
    pub job_id: JobId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<MeetingListing> for MeetingSummaryItem {
    fn from(listing: MeetingListing) -> Self {
        Self {
            job_id: listing.job_id,
            title: listing.title,
            created_at: listing.created_at,
            completed_at: listing.completed_at,
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/meetings", get(list_meetings))
        .with_state(state)
}

/// GET /api/meetings - Completed meetings, newest first.
async fn list_meetings(
    State(state): State<ApiState>,
    Query(params): Query<MeetingQueryParams>,
) -> ApiResult<Json<Vec<MeetingSummaryItem>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let meetings = state
        .db
        .call(move |conn| MeetingRepository::list_completed(conn, limit))
        .await?;

    Ok(Json(meetings.into_iter().map(Into::into).collect()))
}
