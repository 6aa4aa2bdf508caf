use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{ApiState, error::ApiError};

use super::{
    service::{DueReview, ReviewSubmission},
    stats::{self, ReviewStats},
};

/// Create the review routes
pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/reviews/{learner_id}/queue", get(get_due_queue))
        .route("/reviews/{learner_id}/stats", get(get_review_stats))
        .route("/reviews/{learner_id}/{item_id}", post(submit_review))
        .route("/reviews/{learner_id}/{item_id}/track", post(track_item))
}

#[derive(Debug, Deserialize, Validate)]
struct QueueQuery {
    /// At most 500 records per request
    #[validate(range(min = 1, max = 500))]
    limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
struct StatsQuery {
    /// Learner's offset from UTC, used to find the start of "today"
    #[serde(default)]
    #[validate(range(min = -840, max = 840))]
    utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize, Validate)]
struct SubmitReviewRequest {
    /// Range checked by the scheduler
    quality: i32,
    /// Negative values are rejected by the service
    #[serde(default)]
    #[validate(range(max = 86_400))]
    time_spent_seconds: i32,
    submission_id: Option<Uuid>,
}

async fn get_due_queue(
    State(state): State<ApiState>,
    Path(learner_id): Path<Uuid>,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Vec<DueReview>>, ApiError> {
    query.validate()?;

    let queue = state
        .reviews
        .get_due_queue(learner_id, Utc::now(), query.limit)
        .await?;

    Ok(Json(queue))
}

async fn submit_review(
    State(state): State<ApiState>,
    Path((learner_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    let now = Utc::now();
    let submission = ReviewSubmission {
        quality: payload.quality,
        time_spent_seconds: payload.time_spent_seconds,
        submission_id: payload.submission_id,
    };

    let outcome = state
        .reviews
        .record_review(learner_id, item_id, submission, now)
        .await?;

    let due = outcome.item.state().due_status(now);

    Ok(Json(json!({
        "success": true,
        "replayed": outcome.replayed,
        "submission_id": outcome.submission_id,
        "grade": outcome.grade,
        "item": outcome.item,
        "due": due,
    })))
}

async fn track_item(
    State(state): State<ApiState>,
    Path((learner_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let created = state
        .reviews
        .track_item(learner_id, item_id, Utc::now())
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(json!({ "created": created }))))
}

async fn get_review_stats(
    State(state): State<ApiState>,
    Path(learner_id): Path<Uuid>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ReviewStats>, ApiError> {
    query.validate()?;

    let now = Utc::now();
    let day_start = stats::day_start_for_offset(now, query.utc_offset_minutes).ok_or_else(|| {
        ApiError::Validation(format!(
            "Invalid utc_offset_minutes: {}",
            query.utc_offset_minutes
        ))
    })?;

    let stats = state
        .reviews
        .get_review_stats(learner_id, now, day_start)
        .await?;

    Ok(Json(stats))
}
