//! Axum adapter: runs the limiter ahead of the wrapped handler. The limiter
//! itself never inspects request shapes beyond what the key extractor reads.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::error::Error;
use crate::extract::{client_address, KeyExtractor};
use crate::limiter::RateLimiter;
use crate::response::RateLimitRejection;

/// State for [`rate_limit`]: one limiter plus the extractor that maps
/// requests onto bucket keys.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: RateLimiter,
    extractor: KeyExtractor,
}

impl RateLimitState {
    /// Rate limit by the connecting client's address.
    pub fn new(limiter: RateLimiter) -> Self {
        Self::with_extractor(limiter, client_address())
    }

    pub fn with_extractor(limiter: RateLimiter, extractor: KeyExtractor) -> Self {
        Self { limiter, extractor }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

/// Middleware for `axum::middleware::from_fn_with_state`. Admitted requests
/// pass through to the handler unchanged; rejected ones are answered with the
/// structured 429 and never reach it. An extractor that produces no identity
/// fails closed: unidentifiable callers are an integration problem, not a
/// rate-limit bypass.
pub async fn rate_limit(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(key) = (state.extractor)(&request) else {
        error!(uri = %request.uri(), "key extractor produced no identity, failing closed");
        return Error::MissingIdentity.into_response();
    };

    let decision = state.limiter.allow(&key);
    if decision.admitted {
        next.run(request).await
    } else {
        RateLimitRejection::from_decision(&decision).into_response()
    }
}
