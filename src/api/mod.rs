//! HTTP Ingress Module
//!
//! The node's request surface: client-facing cache operations, the
//! peer-to-peer internal endpoints, health and stats, rate limiting and
//! response shaping.
//!
//! ## Submodules
//! - **`handlers`**: Axum request handlers for every endpoint.
//! - **`protocol`**: Endpoint path constants and response DTOs.
//! - **`error`**: The typed error enum mapped onto HTTP status codes.
//! - **`rate_limit`**: Fixed-window admission gate for client traffic.

pub mod error;
pub mod handlers;
pub mod protocol;
pub mod rate_limit;


use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Applies the permissive CORS headers to every response and answers
/// OPTIONS preflights directly with an empty 200.
pub async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        apply_cors_headers(&mut response);
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(&mut response);
    response
}

fn apply_cors_headers(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}
