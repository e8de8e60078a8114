//! Key extraction: mapping an inbound request to the identity string that
//! partitions rate-limit state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request};
use tracing::warn;

/// Identity used when no client address can be determined. Every such request
/// lands in one shared bucket, which is a last resort rather than per-client
/// fairness.
pub const FALLBACK_IDENTITY: &str = "global";

/// Caller-supplied function mapping a request to its rate-limit key.
/// Returning `None` means no identity could be determined; the middleware
/// fails closed on that rather than waving the request through.
pub type KeyExtractor = Arc<dyn Fn(&Request) -> Option<String> + Send + Sync>;

/// The default extractor: the connecting client's network address. When the
/// connection info is missing (e.g. the service was not started with
/// `into_make_service_with_connect_info`), degrades to [`FALLBACK_IDENTITY`]
/// with a warning.
pub fn client_address() -> KeyExtractor {
    Arc::new(|request| Some(client_ip(request)))
}

/// Like [`client_address`] but preferring proxy-set headers
/// (`x-forwarded-for`, then `x-real-ip`). Only for deployments that trust
/// their proxy chain; these headers are trivially spoofable otherwise.
pub fn forwarded_client_address() -> KeyExtractor {
    Arc::new(|request| forwarded_ip(request).or_else(|| Some(client_ip(request))))
}

/// Extractor reading a single header verbatim, e.g. `x-api-key` or
/// `x-user-id`. Requests without the header have no identity and are failed
/// closed by the middleware.
pub fn header_value(name: &'static str) -> KeyExtractor {
    Arc::new(move |request| {
        request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    })
}

fn forwarded_ip(request: &Request) -> Option<String> {
    let headers = request.headers();

    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
}

fn client_ip(request: &Request) -> String {
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => {
            warn!("no client address on request, falling back to a single shared identity");
            FALLBACK_IDENTITY.to_string()
        }
    }
}
