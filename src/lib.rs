//! Per-key token-bucket admission control.
//!
//! A [`RateLimiter`] owns a concurrent map of keys (IPs, user IDs, API keys)
//! to token buckets and decides in constant time whether to admit or reject
//! each request, while tokens replenish continuously at the configured rate.
//! The [`middleware`] module adapts it to axum; everything else is plain
//! library surface driven through [`RateLimiter::allow`].

pub mod bucket;
pub mod config;
pub mod error;
pub mod extract;
pub mod limiter;
pub mod middleware;
pub mod policy;
pub mod response;
pub mod store;

pub use error::{ConfigError, Error, Result};
pub use limiter::{Decision, RateLimiter};
pub use policy::{Policy, PolicyConfig};
