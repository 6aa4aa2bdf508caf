use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::review::ReviewError;

/// Errors returned by HTTP handlers, rendered as `{"error": message}`
#[derive(Error, Debug)]
pub enum ApiError {
    /// 400
    #[error("Validation error: {0}")]
    Validation(String),
    /// 409
    #[error("Conflict: {0}")]
    Conflict(String),
    /// 503
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    /// 500, the detail is only logged
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status of the error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            // Store details stay in the logs
            ApiError::Internal(detail) => {
                tracing::error!("Internal error: {detail}");
                "Internal server error".to_string()
            }
            ApiError::Validation(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg) => msg.clone(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::InvalidQuality(_)
            | ReviewError::InvalidTimeSpent(_)
            | ReviewError::SubmissionReused(_) => {
                ApiError::Validation(err.to_string())
            }
            ReviewError::RecordConflict { .. } => ApiError::Conflict(err.to_string()),
            ReviewError::StoreUnavailable(_) => ApiError::ServiceUnavailable(err.to_string()),
            ReviewError::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nq_srs::SrsError;

    #[test]
    fn test_review_error_status_mapping() {
        let cases = [
            (
                ReviewError::InvalidQuality(SrsError::InvalidQuality(9)),
                StatusCode::BAD_REQUEST,
            ),
            (ReviewError::InvalidTimeSpent(-1), StatusCode::BAD_REQUEST),
            (
                ReviewError::SubmissionReused(uuid::Uuid::nil()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ReviewError::RecordConflict { attempts: 3 },
                StatusCode::CONFLICT,
            ),
            (
                ReviewError::StoreUnavailable("pool timed out".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ReviewError::Store("syntax error".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let response = ApiError::Internal("relation does not exist".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
