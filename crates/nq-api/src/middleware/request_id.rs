//! Request ID middleware.
//!
//! Every request runs inside an `info_span` carrying its id, so all log lines
//! emitted while handling it (store retries included) can be correlated.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the request id, lowercase as required by `HeaderName::from_static`
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest client-supplied id that is kept as is
const MAX_REQUEST_ID_LEN: usize = 128;

/// Reuse the client's `X-Request-ID` when it is sane, otherwise generate one,
/// and echo it on the response.
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        uri = %req.uri(),
    );

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    response
}
