use chrono::{DateTime, Utc};
use nq_srs::ReviewState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review schedule of one learner on one puzzle
/// Unique on (learner_id, item_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewItem {
    /// Learner ID (from the identity service)
    pub learner_id: Uuid,
    /// Puzzle ID (from the content service)
    pub item_id: Uuid,
    /// Interval growth multiplier, never below 1.3
    pub easiness_factor: f64,
    /// Days between `last_reviewed_at` and `next_review_date`
    pub interval_days: i32,
    /// Consecutive successful recalls since the last lapse
    pub repetitions: i32,
    /// When the item becomes due (indexed with learner_id)
    pub next_review_date: DateTime<Utc>,
    /// When the last review was applied
    pub last_reviewed_at: DateTime<Utc>,
    /// Write counter used for conditional upserts, managed by the store
    pub revision: i32,
    /// When this record was created
    pub created_at: DateTime<Utc>,
    /// When this record was last updated
    pub updated_at: DateTime<Utc>,
}

impl ReviewItem {
    /// Seed record created on first puzzle completion
    pub fn seed(learner_id: Uuid, item_id: Uuid, now: DateTime<Utc>) -> Self {
        Self::from_state(learner_id, item_id, ReviewState::seed(now), now)
    }

    /// Fresh record (revision 0) carrying `state`
    pub fn from_state(
        learner_id: Uuid,
        item_id: Uuid,
        state: ReviewState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            learner_id,
            item_id,
            easiness_factor: state.easiness_factor,
            interval_days: state.interval_days,
            repetitions: state.repetitions,
            next_review_date: state.next_review_date,
            last_reviewed_at: state.last_reviewed_at,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// The scheduling fields of this record
    pub const fn state(&self) -> ReviewState {
        ReviewState {
            easiness_factor: self.easiness_factor,
            interval_days: self.interval_days,
            repetitions: self.repetitions,
            next_review_date: self.next_review_date,
            last_reviewed_at: self.last_reviewed_at,
        }
    }

    /// Copy of this record carrying a new schedule
    pub fn with_state(&self, state: ReviewState, now: DateTime<Utc>) -> Self {
        Self {
            easiness_factor: state.easiness_factor,
            interval_days: state.interval_days,
            repetitions: state.repetitions,
            next_review_date: state.next_review_date,
            last_reviewed_at: state.last_reviewed_at,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// One committed review, append-only
/// High-volume table queried by (learner_id, reviewed_at)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewEvent {
    /// Unique identifier
    pub id: Uuid,
    /// Learner who reviewed
    pub learner_id: Uuid,
    /// Puzzle reviewed
    pub item_id: Uuid,
    /// Self-reported recall quality (0-5)
    pub quality: i16,
    /// Seconds the learner spent on the review
    pub time_spent_seconds: i32,
    /// Client-supplied idempotency key (unique when present)
    pub submission_id: Option<Uuid>,
    /// When the review was applied
    pub reviewed_at: DateTime<Utc>,
}

/// Display attributes of a puzzle, owned by the content service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ItemMetadata {
    /// Puzzle ID
    pub item_id: Uuid,
    /// Puzzle title shown in the queue
    pub title: String,
    /// Concept the puzzle practices
    pub math_concept: String,
    /// Difficulty level (1-5)
    pub difficulty: i16,
    /// Map zone containing the puzzle, if any
    pub zone_name: Option<String>,
}

/// Everything written by one review, applied atomically
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCommit {
    /// New state of the record
    pub item: ReviewItem,
    /// Revision read before computing `item`; `None` when the record was absent
    pub expected_revision: Option<i32>,
    /// Event appended with the write; its `submission_id` makes the commit idempotent
    pub event: ReviewEvent,
}

/// Result of a successful [`ReviewCommit`]
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// The review was applied; carries the stored record
    Committed(ReviewItem),
    /// The submission id was already applied; carries the current record unchanged
    Duplicate(ReviewItem),
}

impl CommitOutcome {
    /// The stored record, whether or not this commit changed it
    pub fn into_item(self) -> ReviewItem {
        match self {
            Self::Committed(item) | Self::Duplicate(item) => item,
        }
    }
}
