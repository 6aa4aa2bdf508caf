use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use nq_api::{
    review::ReviewSettings,
    router,
    state::ApiState,
};
use nq_db::MemoryReviewStore;
use serde::Deserialize;
use std::time::Duration;
use tower::ServiceExt;

/// Test state builder backed by the in-memory store
pub struct TestStateBuilder {
    store: MemoryReviewStore,
    settings: ReviewSettings,
}

impl TestStateBuilder {
    pub fn new() -> Self {
        Self {
            store: MemoryReviewStore::new(),
            settings: ReviewSettings {
                retry_base_delay: Duration::from_millis(1),
                ..ReviewSettings::default()
            },
        }
    }

    /// Share a store with the test so it can seed records and metadata
    pub fn with_store(mut self, store: MemoryReviewStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.settings.max_attempts = max_attempts;
        self
    }

    pub fn build(self) -> ApiState {
        ApiState::with_store(self.store, self.settings)
    }

    /// Build the state and wrap the full application in a client
    pub fn client(self) -> TestClient {
        TestClient::new(router::app(self.build(), &[], None))
    }
}

impl Default for TestStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to make requests to the test app
pub struct TestClient {
    router: Router,
}

impl TestClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Send a request and get the response
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        TestResponse {
            status,
            body: body_bytes.to_vec(),
            headers,
        }
    }

    /// Send a GET request
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a POST request with no body
    pub async fn post(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        self.request(request).await
    }

    /// Send a POST request with JSON body
    pub async fn post_json<T: serde::Serialize>(&self, uri: &str, body: &T) -> TestResponse {
        let json_body = serde_json::to_string(body).expect("Failed to serialize body");

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");

        self.request(request).await
    }
}

/// Test response wrapper
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub headers: axum::http::HeaderMap,
}

impl TestResponse {
    /// Get response body as string
    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("Response body is not valid UTF-8")
    }

    /// Parse response body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse JSON response")
    }

    /// Assert status code
    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
    }
}

/// Review fixtures
pub mod fixtures {
    use chrono::{DateTime, Duration, Utc};
    use nq_db::{MemoryReviewStore, ReviewRecordStore, models::{ItemMetadata, ReviewItem}};
    use uuid::Uuid;

    /// Track an item for `learner_id` that became due `overdue_by` ago
    pub async fn due_item(
        store: &MemoryReviewStore,
        learner_id: Uuid,
        overdue_by: Duration,
    ) -> ReviewItem {
        let now = Utc::now();
        let mut item = ReviewItem::seed(learner_id, Uuid::new_v4(), now - Duration::days(30));
        item.next_review_date = now - overdue_by;
        store
            .insert_if_absent(&item)
            .await
            .expect("Failed to seed review item");
        item
    }

    /// Track an item for `learner_id` that is due at `next_review_date`
    pub async fn item_due_at(
        store: &MemoryReviewStore,
        learner_id: Uuid,
        next_review_date: DateTime<Utc>,
    ) -> ReviewItem {
        let mut item = ReviewItem::seed(learner_id, Uuid::new_v4(), next_review_date - Duration::days(1));
        item.next_review_date = next_review_date;
        store
            .insert_if_absent(&item)
            .await
            .expect("Failed to seed review item");
        item
    }

    pub async fn puzzle(store: &MemoryReviewStore, item_id: Uuid, title: &str) {
        store
            .register_metadata(ItemMetadata {
                item_id,
                title: title.to_string(),
                math_concept: "fractions".to_string(),
                difficulty: 2,
                zone_name: Some("Number Island".to_string()),
            })
            .await;
    }
}
