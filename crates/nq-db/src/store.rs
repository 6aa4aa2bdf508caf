use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    MemoryReviewStore, PgReviewStore, StoreError,
    models::{CommitOutcome, ItemMetadata, ReviewCommit, ReviewEvent, ReviewItem},
};

/// Durable keyed storage for review records.
///
/// Implementations must apply [`ReviewRecordStore::commit_review`] atomically:
/// the revision check, the record write and the event insert either all happen
/// or none do.
pub trait ReviewRecordStore: Send + Sync {
    /// The record for the pair, `None` when untracked
    fn get(
        &self,
        learner_id: Uuid,
        item_id: Uuid,
    ) -> impl Future<Output = Result<Option<ReviewItem>, StoreError>> + Send;

    /// All records of a learner, ordered by `next_review_date`
    fn list_for_learner(
        &self,
        learner_id: Uuid,
    ) -> impl Future<Output = Result<Vec<ReviewItem>, StoreError>> + Send;

    /// Records with `next_review_date <= now`, ordered by `next_review_date` then `item_id`
    fn list_due(
        &self,
        learner_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> impl Future<Output = Result<Vec<ReviewItem>, StoreError>> + Send;

    /// Insert `item` unless the pair is already tracked. Returns whether it was inserted.
    fn insert_if_absent(
        &self,
        item: &ReviewItem,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Apply a review. Fails with [`StoreError::Conflict`] when the stored
    /// revision no longer matches `commit.expected_revision`.
    fn commit_review(
        &self,
        commit: &ReviewCommit,
    ) -> impl Future<Output = Result<CommitOutcome, StoreError>> + Send;

    /// Events with `from <= reviewed_at < to`
    fn events_between(
        &self,
        learner_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ReviewEvent>, StoreError>> + Send;

    /// Display metadata for the given items; unknown ids are skipped
    fn item_metadata(
        &self,
        item_ids: &[Uuid],
    ) -> impl Future<Output = Result<Vec<ItemMetadata>, StoreError>> + Send;
}

/// The store backends the server can run with.
#[derive(Debug, Clone)]
pub enum ReviewStore {
    /// Durable store, used when `DATABASE_URL` is set
    Postgres(PgReviewStore),
    /// Process-local store for development and tests
    Memory(MemoryReviewStore),
}

impl ReviewStore {
    /// Label used in logs
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<PgReviewStore> for ReviewStore {
    fn from(store: PgReviewStore) -> Self {
        Self::Postgres(store)
    }
}

impl From<MemoryReviewStore> for ReviewStore {
    fn from(store: MemoryReviewStore) -> Self {
        Self::Memory(store)
    }
}

impl ReviewRecordStore for ReviewStore {
    async fn get(&self, learner_id: Uuid, item_id: Uuid) -> Result<Option<ReviewItem>, StoreError> {
        match self {
            Self::Postgres(store) => store.get(learner_id, item_id).await,
            Self::Memory(store) => store.get(learner_id, item_id).await,
        }
    }

    async fn list_for_learner(&self, learner_id: Uuid) -> Result<Vec<ReviewItem>, StoreError> {
        match self {
            Self::Postgres(store) => store.list_for_learner(learner_id).await,
            Self::Memory(store) => store.list_for_learner(learner_id).await,
        }
    }

    async fn list_due(
        &self,
        learner_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<ReviewItem>, StoreError> {
        match self {
            Self::Postgres(store) => store.list_due(learner_id, now, limit).await,
            Self::Memory(store) => store.list_due(learner_id, now, limit).await,
        }
    }

    async fn insert_if_absent(&self, item: &ReviewItem) -> Result<bool, StoreError> {
        match self {
            Self::Postgres(store) => store.insert_if_absent(item).await,
            Self::Memory(store) => store.insert_if_absent(item).await,
        }
    }

    async fn commit_review(&self, commit: &ReviewCommit) -> Result<CommitOutcome, StoreError> {
        match self {
            Self::Postgres(store) => store.commit_review(commit).await,
            Self::Memory(store) => store.commit_review(commit).await,
        }
    }

    async fn events_between(
        &self,
        learner_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ReviewEvent>, StoreError> {
        match self {
            Self::Postgres(store) => store.events_between(learner_id, from, to).await,
            Self::Memory(store) => store.events_between(learner_id, from, to).await,
        }
    }

    async fn item_metadata(&self, item_ids: &[Uuid]) -> Result<Vec<ItemMetadata>, StoreError> {
        match self {
            Self::Postgres(store) => store.item_metadata(item_ids).await,
            Self::Memory(store) => store.item_metadata(item_ids).await,
        }
    }
}
