use nq_db::{MemoryReviewStore, PgReviewStore, ReviewStore};

use crate::{
    ApiConfig,
    review::{ReviewQueueService, ReviewSettings},
};

/// Shared handler state
#[derive(Clone, Debug)]
pub struct ApiState {
    /// Review queue over the configured store
    pub reviews: ReviewQueueService,
}

impl ApiState {
    /// Connect the configured store, migrating Postgres first
    pub async fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let store = match config.database_url.as_deref() {
            Some(database_url) => {
                let pool = nq_db::create_pool(database_url, config.db_max_connections).await?;
                nq_db::ensure_db_and_migrate(database_url, &pool).await?;
                ReviewStore::from(PgReviewStore::new(pool))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, review records are kept in memory only");
                ReviewStore::from(MemoryReviewStore::new())
            }
        };

        tracing::info!(backend = store.backend_name(), "Review store ready");

        Ok(Self::with_store(store, config.review_settings()))
    }

    /// State over an existing store
    pub fn with_store(store: impl Into<ReviewStore>, settings: ReviewSettings) -> Self {
        Self {
            reviews: ReviewQueueService::new(store.into(), settings),
        }
    }
}
