use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Fatal at construction; a limiter is never built from a bad config.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The key extractor produced no identity for a request. Surfaced as a
    /// server error rather than admitting the request, so a broken extractor
    /// cannot silently disable rate limiting.
    #[error("no identity could be extracted from the request")]
    MissingIdentity,
}

/// Configuration errors for the two policy construction forms.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("malformed rate shorthand {0:?}, expected \"<N>/<period>\"")]
    MalformedShorthand(String),

    #[error("unknown period unit {0:?}, expected second, minute, hour or day")]
    UnknownPeriod(String),

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("rate shorthand and explicit capacity/refill parameters are mutually exclusive")]
    MixedForms,

    #[error("incomplete rate limit config: supply either a shorthand rate or all of capacity, refill_rate and refill_period_secs")]
    Incomplete,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": "internal_error",
            "message": self.to_string(),
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
