//! Spaced-repetition review queue: service, stats and HTTP routes.

pub mod error;
pub mod routes;
pub mod service;
pub mod stats;

pub use error::ReviewError;
pub use routes::routes;
pub use service::{DueReview, ReviewOutcome, ReviewQueueService, ReviewSettings, ReviewSubmission};
pub use stats::ReviewStats;
