use axum::body::Body;
use axum::response::Response;

/// Propagate an upstream rejection verbatim: same status, same body, no
/// synthesized error shape.
pub(crate) fn verbatim_upstream_response(status: u16, body: String) -> Response {
    let status =
        http::StatusCode::from_u16(status).unwrap_or(http::StatusCode::BAD_GATEWAY);
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

/// Wrap a frame body as a `text/event-stream` response.
pub(crate) fn sse_response(body: Body) -> Response {
    let mut response = Response::new(body);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/event-stream"),
    );
    response.headers_mut().insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    response
}

/// A short fixed SSE stream, used when the backend rejects at stream open:
/// the dialect's error event (and terminator) with no content events first.
pub(crate) fn sse_fixed_frames(frames: Vec<String>) -> Response {
    sse_response(Body::from(frames.concat()))
}
