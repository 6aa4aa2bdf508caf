use nq_db::StoreError;
use nq_srs::SrsError;
use thiserror::Error;
use uuid::Uuid;

/// Failures of the review service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    /// Quality outside `0..=5`; nothing was written
    #[error(transparent)]
    InvalidQuality(#[from] SrsError),
    /// Negative time spent; nothing was written
    #[error("invalid time spent {0}: must not be negative")]
    InvalidTimeSpent(i32),
    /// The client reused a submission id on another item; nothing was written
    #[error("submission {0} was already used for another review item")]
    SubmissionReused(Uuid),
    /// Concurrent writers kept winning; the caller may resubmit
    #[error("review was modified concurrently, gave up after {attempts} attempts")]
    RecordConflict {
        /// Attempts made before giving up
        attempts: u32,
    },
    /// The store stayed unreachable or too slow across all attempts
    #[error("review store unavailable: {0}")]
    StoreUnavailable(String),
    /// Non-retryable store failure
    #[error("review store error: {0}")]
    Store(String),
}

impl From<StoreError> for ReviewError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::RecordConflict { attempts: 1 },
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
            StoreError::SubmissionReused(submission_id) => Self::SubmissionReused(submission_id),
            StoreError::Query(reason) => Self::Store(reason),
        }
    }
}
