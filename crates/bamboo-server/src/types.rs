//! HTTP request and response types.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;

/// HTTP request type handed to the engine.
pub type Request = http::Request<Full<Bytes>>;

/// HTTP response type produced by the engine.
pub type Response = http::Response<Full<Bytes>>;

/// Builds a response with `status` and a raw body.
pub fn response(status: StatusCode, body: impl Into<Bytes>) -> Response {
    let mut response = http::Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
}

/// Builds an `application/json` response.
pub fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response {
    let mut response = response(status, body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Builds a `text/plain` response.
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response {
    let mut response = response(status, body);
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
