use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{ReviewEvent, ReviewItem};

/// The record of one (learner, puzzle) pair.
pub async fn get_review_item<'e, E>(
    executor: E,
    learner_id: Uuid,
    item_id: Uuid,
) -> Result<Option<ReviewItem>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT learner_id, item_id, easiness_factor, interval_days, repetitions,
                   next_review_date, last_reviewed_at, revision, created_at, updated_at
            FROM review_items
            WHERE learner_id = $1 AND item_id = $2
        "#,
    )
    .bind(learner_id)
    .bind(item_id)
    .fetch_optional(executor)
    .await
}

/// All records of a learner, soonest due first.
pub async fn list_review_items<'e, E>(
    executor: E,
    learner_id: Uuid,
) -> Result<Vec<ReviewItem>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT learner_id, item_id, easiness_factor, interval_days, repetitions,
                   next_review_date, last_reviewed_at, revision, created_at, updated_at
            FROM review_items
            WHERE learner_id = $1
            ORDER BY next_review_date, item_id
        "#,
    )
    .bind(learner_id)
    .fetch_all(executor)
    .await
}

/// Items due at `now`, most overdue first. A `None` limit returns all of them.
pub async fn list_due_review_items<'e, E>(
    executor: E,
    learner_id: Uuid,
    now: DateTime<Utc>,
    limit: Option<i64>,
) -> Result<Vec<ReviewItem>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT learner_id, item_id, easiness_factor, interval_days, repetitions,
                   next_review_date, last_reviewed_at, revision, created_at, updated_at
            FROM review_items
            WHERE learner_id = $1 AND next_review_date <= $2
            ORDER BY next_review_date, item_id
            LIMIT $3
        "#,
    )
    .bind(learner_id)
    .bind(now)
    .bind(limit)
    .fetch_all(executor)
    .await
}

/// Insert a seed record. Returns `false` if the pair is already tracked.
pub async fn insert_review_item_if_absent<'e, E>(
    executor: E,
    item: &ReviewItem,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO review_items (learner_id, item_id, easiness_factor, interval_days, repetitions, next_review_date, last_reviewed_at, revision)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
            ON CONFLICT (learner_id, item_id) DO NOTHING
        "#,
    )
    .bind(item.learner_id)
    .bind(item.item_id)
    .bind(item.easiness_factor)
    .bind(item.interval_days)
    .bind(item.repetitions)
    .bind(item.next_review_date)
    .bind(item.last_reviewed_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Conditional upsert keyed on (learner_id, item_id).
///
/// With `expected_revision = None` the row is only inserted if absent; with
/// `Some(rev)` it is only updated if its revision is still `rev`. Returns the
/// stored row, or `None` when the condition did not hold.
pub async fn upsert_review_item<'e, E>(
    executor: E,
    item: &ReviewItem,
    expected_revision: Option<i32>,
) -> Result<Option<ReviewItem>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            INSERT INTO review_items (learner_id, item_id, easiness_factor, interval_days, repetitions, next_review_date, last_reviewed_at, revision)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
            ON CONFLICT (learner_id, item_id)
            DO UPDATE SET
                easiness_factor = EXCLUDED.easiness_factor,
                interval_days = EXCLUDED.interval_days,
                repetitions = EXCLUDED.repetitions,
                next_review_date = EXCLUDED.next_review_date,
                last_reviewed_at = EXCLUDED.last_reviewed_at,
                revision = review_items.revision + 1,
                updated_at = NOW()
            WHERE review_items.revision = $8
            RETURNING learner_id, item_id, easiness_factor, interval_days, repetitions,
                      next_review_date, last_reviewed_at, revision, created_at, updated_at
        "#,
    )
    .bind(item.learner_id)
    .bind(item.item_id)
    .bind(item.easiness_factor)
    .bind(item.interval_days)
    .bind(item.repetitions)
    .bind(item.next_review_date)
    .bind(item.last_reviewed_at)
    .bind(expected_revision)
    .fetch_optional(executor)
    .await
}

/// The (learner_id, item_id) pair a submission was applied to, if any.
pub async fn find_submission<'e, E>(
    executor: E,
    submission_id: Uuid,
) -> Result<Option<(Uuid, Uuid)>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT learner_id, item_id
            FROM review_events
            WHERE submission_id = $1
        "#,
    )
    .bind(submission_id)
    .fetch_optional(executor)
    .await
}

/// Append an event. Fails with a unique violation on a reused `submission_id`.
pub async fn insert_review_event<'e, E>(executor: E, event: &ReviewEvent) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO review_events (id, learner_id, item_id, quality, time_spent_seconds, submission_id, reviewed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.id)
    .bind(event.learner_id)
    .bind(event.item_id)
    .bind(event.quality)
    .bind(event.time_spent_seconds)
    .bind(event.submission_id)
    .bind(event.reviewed_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Events of a learner with `from <= reviewed_at < to`.
pub async fn list_review_events<'e, E>(
    executor: E,
    learner_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<ReviewEvent>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, learner_id, item_id, quality, time_spent_seconds, submission_id, reviewed_at
            FROM review_events
            WHERE learner_id = $1 AND reviewed_at >= $2 AND reviewed_at < $3
            ORDER BY reviewed_at
        "#,
    )
    .bind(learner_id)
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await
}
