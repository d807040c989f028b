use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::{
    AppState,
    middleware::{RateLimiter, log_errors, rate_limit},
    routes,
    shutdown::shutdown_signal,
};

/// Builds the HTTP router. The limiter, when present, only guards the
/// analyze endpoints.
pub fn build_router(state: AppState, rate_limiter: Option<Arc<RateLimiter>>) -> Router {
    let mut analyze_routes = Router::new()
        .route("/api/analyze", post(routes::linguistic::analyze))
        .route("/web/analyze", post(routes::web::analyze));

    if let Some(limiter) = rate_limiter {
        analyze_routes =
            analyze_routes.layer(axum::middleware::from_fn_with_state(limiter, rate_limit));
    }

    Router::new()
        .route("/", get(routes::web::index))
        .route("/chat", get(routes::web::index))
        .route("/health", get(routes::health::health))
        .merge(analyze_routes)
        .layer(axum::middleware::from_fn(log_errors))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let rate_limiter = RateLimiter::from_config(&state.config)
        .context("invalid REDIS_URL")?
        .map(Arc::new);
    if rate_limiter.is_none() {
        tracing::info!("REDIS_URL not set, rate limiting disabled");
    }

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    let app = build_router(state, rate_limiter);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")
}
