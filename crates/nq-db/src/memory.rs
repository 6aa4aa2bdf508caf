//! In-memory review store.
//!
//! Used when no database is configured and by the test suites. All state lives
//! behind one `RwLock`, so every write is trivially atomic.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    StoreError,
    models::{CommitOutcome, ItemMetadata, ReviewCommit, ReviewEvent, ReviewItem},
    store::ReviewRecordStore,
};

#[derive(Debug, Default)]
struct MemoryState {
    items: HashMap<(Uuid, Uuid), ReviewItem>,
    events: Vec<ReviewEvent>,
    /// Submission id to the (learner, item) pair it was applied to
    submissions: HashMap<Uuid, (Uuid, Uuid)>,
    metadata: HashMap<Uuid, ItemMetadata>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryReviewStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryReviewStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register puzzle metadata, standing in for the content service.
    pub async fn register_metadata(&self, metadata: ItemMetadata) {
        let mut state = self.state.write().await;
        state.metadata.insert(metadata.item_id, metadata);
    }

    /// Number of events logged for a learner, across all days.
    pub async fn event_count(&self, learner_id: Uuid) -> usize {
        let state = self.state.read().await;
        state
            .events
            .iter()
            .filter(|e| e.learner_id == learner_id)
            .count()
    }
}

fn sort_by_due(items: &mut [ReviewItem]) {
    items.sort_by(|a, b| {
        a.next_review_date
            .cmp(&b.next_review_date)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
}

impl ReviewRecordStore for MemoryReviewStore {
    async fn get(&self, learner_id: Uuid, item_id: Uuid) -> Result<Option<ReviewItem>, StoreError> {
        let state = self.state.read().await;
        Ok(state.items.get(&(learner_id, item_id)).cloned())
    }

    async fn list_for_learner(&self, learner_id: Uuid) -> Result<Vec<ReviewItem>, StoreError> {
        let state = self.state.read().await;
        let mut items: Vec<ReviewItem> = state
            .items
            .values()
            .filter(|item| item.learner_id == learner_id)
            .cloned()
            .collect();
        sort_by_due(&mut items);
        Ok(items)
    }

    async fn list_due(
        &self,
        learner_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<ReviewItem>, StoreError> {
        let state = self.state.read().await;
        let mut items: Vec<ReviewItem> = state
            .items
            .values()
            .filter(|item| item.learner_id == learner_id && item.state().is_due(now))
            .cloned()
            .collect();
        sort_by_due(&mut items);
        if let Some(limit) = limit {
            items.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(items)
    }

    async fn insert_if_absent(&self, item: &ReviewItem) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let key = (item.learner_id, item.item_id);
        if state.items.contains_key(&key) {
            return Ok(false);
        }
        state.items.insert(key, ReviewItem { revision: 0, ..item.clone() });
        Ok(true)
    }

    async fn commit_review(&self, commit: &ReviewCommit) -> Result<CommitOutcome, StoreError> {
        let mut state = self.state.write().await;
        let key = (commit.item.learner_id, commit.item.item_id);

        if let Some(submission_id) = commit.event.submission_id
            && let Some(&applied_to) = state.submissions.get(&submission_id)
        {
            if applied_to != key {
                return Err(StoreError::SubmissionReused(submission_id));
            }
            let current = state.items.get(&key).cloned().ok_or_else(|| {
                StoreError::Query(format!(
                    "submission {submission_id} recorded without a review item"
                ))
            })?;
            return Ok(CommitOutcome::Duplicate(current));
        }

        let stored = match (state.items.get(&key), commit.expected_revision) {
            (None, None) => ReviewItem {
                revision: 0,
                ..commit.item.clone()
            },
            (Some(current), Some(expected)) if current.revision == expected => ReviewItem {
                revision: current.revision + 1,
                created_at: current.created_at,
                ..commit.item.clone()
            },
            _ => return Err(StoreError::Conflict),
        };

        state.items.insert(key, stored.clone());
        state.events.push(commit.event.clone());
        if let Some(submission_id) = commit.event.submission_id {
            state.submissions.insert(submission_id, key);
        }

        Ok(CommitOutcome::Committed(stored))
    }

    async fn events_between(
        &self,
        learner_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ReviewEvent>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.learner_id == learner_id && e.reviewed_at >= from && e.reviewed_at < to)
            .cloned()
            .collect())
    }

    async fn item_metadata(&self, item_ids: &[Uuid]) -> Result<Vec<ItemMetadata>, StoreError> {
        let state = self.state.read().await;
        Ok(item_ids
            .iter()
            .filter_map(|id| state.metadata.get(id).cloned())
            .collect())
    }
}
