//! Request interceptors applied ahead of every route.

use axum::{
    extract::Request,
    http::{header::CONTENT_TYPE, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Reject `POST` and `PUT` requests whose `Content-Type` is not exactly
/// `application/json`. Parameters such as `; charset=utf-8` are rejected too.
pub async fn require_json_content_type(request: Request, next: Next) -> Response {
    let method = request.method();
    if method == Method::POST || method == Method::PUT {
        let is_json = request
            .headers()
            .get(CONTENT_TYPE)
            .is_some_and(|value| value.as_bytes() == JSON_MEDIA_TYPE.as_bytes());

        if !is_json {
            tracing::debug!(
                method = %method,
                path = %request.uri().path(),
                "rejecting request without JSON content type"
            );
            return AppError::unsupported_media_type("Content-Type must be application/json")
                .into_response();
        }
    }

    next.run(request).await
}
