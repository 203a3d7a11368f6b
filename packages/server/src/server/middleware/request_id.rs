use axum::http::HeaderValue;
use axum::{middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

/// Stamp every response with a short request id so clients can quote it and
/// operators can find the matching log lines.
pub async fn request_id_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let id = Uuid::new_v4().simple().to_string()[..8].to_string();

    let span = tracing::info_span!("request", request_id = %id);
    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
