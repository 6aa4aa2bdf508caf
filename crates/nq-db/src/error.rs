use thiserror::Error;
use uuid::Uuid;

/// Failures of a review record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional write lost against a concurrent writer
    #[error("review record was modified concurrently")]
    Conflict,
    /// The backing store could not be reached in time
    #[error("review store unavailable: {0}")]
    Unavailable(String),
    /// The submission id was already used for another (learner, item) pair
    #[error("submission {0} was already used for another review item")]
    SubmissionReused(Uuid),
    /// Any other database failure
    #[error("review store query failed: {0}")]
    Query(String),
}

impl StoreError {
    /// Whether retrying the same operation may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict | Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => Self::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Self::Conflict,
            _ => Self::Query(err.to_string()),
        }
    }
}
