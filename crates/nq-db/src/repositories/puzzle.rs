use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::ItemMetadata;

/// Metadata of the given puzzles, unknown ids skipped.
pub async fn get_puzzle_metadata<'e, E>(
    executor: E,
    item_ids: &[Uuid],
) -> Result<Vec<ItemMetadata>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                id as item_id,
                title,
                math_concept,
                difficulty,
                zone_name
            FROM puzzles
            WHERE id = ANY($1)
        "#,
    )
    .bind(item_ids)
    .fetch_all(executor)
    .await
}
