use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::limiter::Decision;

/// Structured body of a "too many requests" response.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitRejection {
    pub message: String,
    pub limit: u64,
    pub remaining: u64,
    pub reset_in_seconds: u64,
}

impl RateLimitRejection {
    pub fn from_decision(decision: &Decision) -> Self {
        Self {
            message: "Rate limit exceeded. Try again later.".to_string(),
            limit: decision.limit as u64,
            remaining: decision.remaining.floor() as u64,
            reset_in_seconds: decision.retry_after_secs,
        }
    }
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(&self)).into_response();

        let headers = response.headers_mut();
        headers.insert("x-ratelimit-limit", int_header(self.limit));
        headers.insert("x-ratelimit-remaining", int_header(self.remaining));
        headers.insert("x-ratelimit-reset", int_header(self.reset_in_seconds));
        headers.insert(header::RETRY_AFTER, int_header(self.reset_in_seconds));

        response
    }
}

fn int_header(value: u64) -> HeaderValue {
    // A decimal u64 is always a valid header value.
    HeaderValue::from_str(&value.to_string()).unwrap_or(HeaderValue::from_static("0"))
}
