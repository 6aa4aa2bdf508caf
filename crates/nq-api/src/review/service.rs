use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};
use nq_db::{
    ReviewRecordStore, ReviewStore, StoreError,
    models::{CommitOutcome, ItemMetadata, ReviewCommit, ReviewEvent, ReviewItem},
};
use nq_srs::{DueStatus, Quality, RecallGrade, ReviewState, SchedulerConfig};
use serde::Serialize;
use uuid::Uuid;

use super::{
    error::ReviewError,
    stats::{self, ReviewStats},
};
use crate::metrics;

/// Tunables of the review service
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewSettings {
    /// Attempts per operation, first try included
    pub max_attempts: u32,
    /// Backoff before the second attempt after an unavailable store; doubles after that
    pub retry_base_delay: Duration,
    /// Upper bound for every single store call
    pub store_timeout: Duration,
    /// SM-2 constants
    pub scheduler: SchedulerConfig,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(25),
            store_timeout: Duration::from_secs(2),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// A review submitted by a learner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSubmission {
    /// Raw quality, validated by the service
    pub quality: i32,
    /// Time the learner spent on the review
    pub time_spent_seconds: i32,
    /// Idempotency key; one is generated when absent
    pub submission_id: Option<Uuid>,
}

/// Result of a committed review
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewOutcome {
    /// Stored record after the review
    pub item: ReviewItem,
    /// Idempotency key the review was stored under
    pub submission_id: Uuid,
    /// How well the learner recalled the puzzle
    pub grade: RecallGrade,
    /// `true` when the submission had already been applied and nothing changed
    pub replayed: bool,
}

/// A due record joined with its puzzle metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DueReview {
    #[serde(flatten)]
    pub item: ReviewItem,
    /// Overdue days at the time the queue was read
    pub due: DueStatus,
    /// `None` when the puzzle's metadata could not be loaded
    pub puzzle: Option<ItemMetadata>,
}

/// Orchestrates the scheduler and the review store.
///
/// Holds no per-learner state; any number of instances can serve the same store.
#[derive(Debug, Clone)]
pub struct ReviewQueueService<S = ReviewStore> {
    store: S,
    settings: ReviewSettings,
}

impl<S: ReviewRecordStore> ReviewQueueService<S> {
    pub const fn new(store: S, settings: ReviewSettings) -> Self {
        Self { store, settings }
    }

    /// Records due at `now`, most overdue first, with puzzle metadata attached.
    ///
    /// An empty queue is `Ok(vec![])`; a store failure is an error, never an empty queue.
    #[tracing::instrument(skip(self))]
    pub async fn get_due_queue(
        &self,
        learner_id: Uuid,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<DueReview>, ReviewError> {
        let store = &self.store;
        let items = self
            .with_retry("list_due", move || store.list_due(learner_id, now, limit))
            .await?;

        if items.is_empty() {
            return Ok(Vec::new());
        }

        let item_ids: Vec<Uuid> = items.iter().map(|item| item.item_id).collect();
        let ids = item_ids.as_slice();
        // Metadata is display-only, a failed lookup should not hide due reviews
        let metadata: HashMap<Uuid, ItemMetadata> = match self
            .with_retry("item_metadata", move || store.item_metadata(ids))
            .await
        {
            Ok(found) => found.into_iter().map(|m| (m.item_id, m)).collect(),
            Err(e) => {
                tracing::warn!("Serving review queue without puzzle metadata: {e}");
                HashMap::new()
            }
        };

        tracing::debug!(due = items.len(), "Loaded review queue");

        Ok(items
            .into_iter()
            .map(|item| DueReview {
                due: item.state().due_status(now),
                puzzle: metadata.get(&item.item_id).cloned(),
                item,
            })
            .collect())
    }

    /// Apply a learner's self-graded review.
    ///
    /// The read, the scheduler step and the conditional write form one attempt;
    /// an attempt that loses against a concurrent writer is retried from the read.
    #[tracing::instrument(skip(self, submission), fields(quality = submission.quality))]
    pub async fn record_review(
        &self,
        learner_id: Uuid,
        item_id: Uuid,
        submission: ReviewSubmission,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, ReviewError> {
        let quality = Quality::new(submission.quality).inspect_err(|e| {
            tracing::warn!("Rejected review: {e}");
            metrics::record_review_outcome("invalid");
        })?;
        if submission.time_spent_seconds < 0 {
            metrics::record_review_outcome("invalid");
            return Err(ReviewError::InvalidTimeSpent(submission.time_spent_seconds));
        }

        // Fixed before the first attempt so a retry after an ambiguous commit is detected
        let submission_id = submission.submission_id.unwrap_or_else(Uuid::new_v4);
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = self
                .try_record(learner_id, item_id, quality, &submission, submission_id, now)
                .await;

            match result {
                Ok(outcome) => {
                    let label = if outcome.replayed { "replayed" } else { "committed" };
                    metrics::record_review_outcome(label);
                    tracing::info!(
                        repetitions = outcome.item.repetitions,
                        interval_days = outcome.item.interval_days,
                        replayed = outcome.replayed,
                        "Review recorded"
                    );
                    return Ok(outcome);
                }
                Err(StoreError::Conflict) if attempt < max_attempts => {
                    tracing::debug!(attempt, "Concurrent review detected, retrying");
                    metrics::record_store_retry("record_review", "conflict");
                }
                Err(StoreError::Conflict) => {
                    tracing::warn!(attempt, "Giving up on review after repeated conflicts");
                    metrics::record_review_outcome("conflict");
                    return Err(ReviewError::RecordConflict { attempts: attempt });
                }
                Err(StoreError::Unavailable(reason)) if attempt < max_attempts => {
                    tracing::warn!(attempt, "Review store unavailable, backing off: {reason}");
                    metrics::record_store_retry("record_review", "unavailable");
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(StoreError::SubmissionReused(reused)) => {
                    tracing::warn!(%reused, "Rejected review: submission id reused on another item");
                    metrics::record_review_outcome("invalid");
                    return Err(ReviewError::SubmissionReused(reused));
                }
                Err(e) => {
                    metrics::record_review_outcome("failed");
                    return Err(e.into());
                }
            }
        }
    }

    async fn try_record(
        &self,
        learner_id: Uuid,
        item_id: Uuid,
        quality: Quality,
        submission: &ReviewSubmission,
        submission_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, StoreError> {
        let current = self
            .bounded("get", self.store.get(learner_id, item_id))
            .await?;

        // An untracked item is reviewed from the seed state
        let (base, expected_revision) = match current {
            Some(item) => {
                let revision = item.revision;
                (item, Some(revision))
            }
            None => (
                ReviewItem::from_state(
                    learner_id,
                    item_id,
                    ReviewState::seed_with(&self.settings.scheduler, now),
                    now,
                ),
                None,
            ),
        };

        let next = base
            .state()
            .advance_with(&self.settings.scheduler, quality, now);

        let commit = ReviewCommit {
            item: base.with_state(next, now),
            expected_revision,
            event: ReviewEvent {
                id: Uuid::new_v4(),
                learner_id,
                item_id,
                quality: i16::from(quality.value()),
                time_spent_seconds: submission.time_spent_seconds,
                submission_id: Some(submission_id),
                reviewed_at: now,
            },
        };

        let outcome = self
            .bounded("commit_review", self.store.commit_review(&commit))
            .await?;

        let replayed = matches!(outcome, CommitOutcome::Duplicate(_));
        Ok(ReviewOutcome {
            item: outcome.into_item(),
            submission_id,
            grade: quality.grade(),
            replayed,
        })
    }

    /// Start tracking a puzzle the learner has just solved for the first time.
    ///
    /// Returns `true` when a seed record was created, `false` when the pair was already tracked.
    #[tracing::instrument(skip(self))]
    pub async fn track_item(
        &self,
        learner_id: Uuid,
        item_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, ReviewError> {
        let seed = ReviewItem::from_state(
            learner_id,
            item_id,
            ReviewState::seed_with(&self.settings.scheduler, now),
            now,
        );
        let store = &self.store;
        let seed = &seed;
        let created = self
            .with_retry("insert_if_absent", move || store.insert_if_absent(seed))
            .await?;

        if created {
            tracing::info!("Started tracking puzzle for review");
        } else {
            tracing::debug!("Puzzle already tracked");
        }

        Ok(created)
    }

    /// Summary counters for a learner.
    ///
    /// `day_start` is the start of the learner's current calendar day, already
    /// resolved to UTC by the caller.
    #[tracing::instrument(skip(self))]
    pub async fn get_review_stats(
        &self,
        learner_id: Uuid,
        now: DateTime<Utc>,
        day_start: DateTime<Utc>,
    ) -> Result<ReviewStats, ReviewError> {
        let store = &self.store;
        let day_end = stats::day_end(day_start);

        let items = self
            .with_retry("list_for_learner", move || store.list_for_learner(learner_id))
            .await?;
        let events = self
            .with_retry("events_between", move || {
                store.events_between(learner_id, day_start, day_end)
            })
            .await?;

        Ok(stats::aggregate(&items, &events, now, day_start))
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.settings.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "{operation} timed out after {:?}",
                self.settings.store_timeout
            ))),
        }
    }

    /// Run an idempotent store call, retrying transient failures.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, ReviewError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.bounded(operation, call()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(operation, attempt, "Transient store error, retrying: {e}");
                    let reason = match e {
                        StoreError::Conflict => "conflict",
                        _ => "unavailable",
                    };
                    metrics::record_store_retry(operation, reason);
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(e) => {
                    tracing::error!(operation, attempt, "Store call failed: {e}");
                    return Err(e.into());
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.settings
            .retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}
