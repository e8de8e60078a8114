use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::State;
use axum::routing::get;
use axum::{middleware, Json, Router};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tollbooth::config::Config;
use tollbooth::extract::{client_address, forwarded_client_address};
use tollbooth::middleware::{rate_limit, RateLimitState};
use tollbooth::RateLimiter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tollbooth={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let policy = config.policy.build()?;
    tracing::info!(
        capacity = policy.capacity(),
        refill_rate = policy.refill_rate(),
        refill_period_secs = policy.refill_period().as_secs_f64(),
        "starting tollbooth"
    );

    let limiter = RateLimiter::new(policy);
    let _sweeper = limiter.spawn_sweeper(config.sweep_interval);

    let extractor = if config.trust_forwarded {
        forwarded_client_address()
    } else {
        client_address()
    };
    let state = RateLimitState::with_extractor(limiter, extractor);

    let app = Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, rate_limit))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "ok" }))
}

async fn status(State(state): State<RateLimitState>) -> Json<serde_json::Value> {
    let limiter = state.limiter();
    Json(serde_json::json!({
        "tracked_keys": limiter.tracked_keys(),
        "limit": limiter.policy().capacity(),
        "refill_rate": limiter.policy().refill_rate(),
        "refill_period_secs": limiter.policy().refill_period().as_secs_f64(),
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        },
        _ = terminate => {
            tracing::info!("received terminate signal, shutting down");
        },
    }
}
