use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    StoreError,
    models::{CommitOutcome, ItemMetadata, ReviewCommit, ReviewEvent, ReviewItem},
    repositories::{puzzle, review},
    store::ReviewRecordStore,
};

/// PostgreSQL-backed review store.
#[derive(Debug, Clone)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    /// Store over an already migrated pool
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReviewRecordStore for PgReviewStore {
    async fn get(&self, learner_id: Uuid, item_id: Uuid) -> Result<Option<ReviewItem>, StoreError> {
        Ok(review::get_review_item(&self.pool, learner_id, item_id).await?)
    }

    async fn list_for_learner(&self, learner_id: Uuid) -> Result<Vec<ReviewItem>, StoreError> {
        Ok(review::list_review_items(&self.pool, learner_id).await?)
    }

    async fn list_due(
        &self,
        learner_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<ReviewItem>, StoreError> {
        Ok(review::list_due_review_items(&self.pool, learner_id, now, limit).await?)
    }

    async fn insert_if_absent(&self, item: &ReviewItem) -> Result<bool, StoreError> {
        Ok(review::insert_review_item_if_absent(&self.pool, item).await?)
    }

    async fn commit_review(&self, commit: &ReviewCommit) -> Result<CommitOutcome, StoreError> {
        // Single transaction for atomicity; dropping it on an early return rolls back
        let mut tx = self.pool.begin().await?;

        if let Some(submission_id) = commit.event.submission_id
            && let Some(applied_to) = review::find_submission(&mut *tx, submission_id).await?
        {
            if applied_to != (commit.item.learner_id, commit.item.item_id) {
                return Err(StoreError::SubmissionReused(submission_id));
            }
            let current =
                review::get_review_item(&mut *tx, commit.item.learner_id, commit.item.item_id)
                    .await?
                    .ok_or_else(|| {
                        StoreError::Query(format!(
                            "submission {submission_id} recorded without a review item"
                        ))
                    })?;
            tx.commit().await?;
            return Ok(CommitOutcome::Duplicate(current));
        }

        let Some(stored) =
            review::upsert_review_item(&mut *tx, &commit.item, commit.expected_revision).await?
        else {
            tracing::debug!(
                learner_id = %commit.item.learner_id,
                item_id = %commit.item.item_id,
                expected_revision = ?commit.expected_revision,
                "Conditional upsert matched no row"
            );
            return Err(StoreError::Conflict);
        };

        review::insert_review_event(&mut *tx, &commit.event).await?;

        tx.commit().await?;

        Ok(CommitOutcome::Committed(stored))
    }

    async fn events_between(
        &self,
        learner_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ReviewEvent>, StoreError> {
        Ok(review::list_review_events(&self.pool, learner_id, from, to).await?)
    }

    async fn item_metadata(&self, item_ids: &[Uuid]) -> Result<Vec<ItemMetadata>, StoreError> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(puzzle::get_puzzle_metadata(&self.pool, item_ids).await?)
    }
}
