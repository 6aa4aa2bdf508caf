use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use crate::{
    metrics::{metrics_handler, track_metrics},
    middleware::{create_cors_layer, request_id_middleware},
    state::ApiState,
    v1,
};

/// Routes without middleware or state
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health))
        .nest("/v1", v1::routes())
        .fallback(handler_404)
}

/// Full application: routes, state and the middleware stack.
///
/// `/metrics` is served and requests are measured only when a Prometheus
/// handle is given.
pub fn app(
    state: ApiState,
    allowed_origins: &[String],
    metrics: Option<PrometheusHandle>,
) -> Router {
    let mut app = router().with_state(state);

    if let Some(handle) = metrics {
        app = app
            .layer(middleware::from_fn(track_metrics))
            .merge(
                Router::new()
                    .route("/metrics", get(metrics_handler))
                    .with_state(handle),
            );
    }

    app.layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(create_cors_layer(allowed_origins))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}
