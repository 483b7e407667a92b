//! HTTP gateway: routing, middleware wiring, server startup.

pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use utoipa::OpenApi;

use crate::auth::{handlers as auth_handlers, middleware::require_auth};
use crate::config::AppConfig;
use crate::notifications::handlers as notification_handlers;
use crate::websocket::ws_handler;
use openapi::ApiDoc;
use state::AppState;
use types::{ApiResponse, HealthResponse};

/// Liveness probe
///
/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthResponse>> {
    let (_, live_connections) = state.registry.stats();
    Json(ApiResponse::success(HealthResponse {
        status: "ok",
        live_connections,
    }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/check-username", get(auth_handlers::check_username))
        .route("/signup", post(auth_handlers::signup))
        .route("/login", post(auth_handlers::login))
        .route("/verify", post(auth_handlers::verify))
        .route("/refresh", post(auth_handlers::refresh))
        .route("/logout", post(auth_handlers::logout));

    let protected_auth_routes = Router::new()
        .route("/me", get(auth_handlers::me))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let notification_routes = Router::new()
        .route("/", get(notification_handlers::list_notifications))
        .route("/{id}/read", post(notification_handlers::mark_read))
        .route("/read-all", post(notification_handlers::mark_all_read))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .route("/api-doc/openapi.json", get(openapi_json))
        .route("/ws", get(ws_handler))
        .nest("/v1/auth", auth_routes.merge(protected_auth_routes))
        .nest("/v1/notifications", notification_routes)
        .with_state(state)
}

/// Start the HTTP server. Blocks until shutdown.
pub async fn run_server(config: &AppConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    // Background sweep keeps the revocation set bounded by the access TTL
    let blacklist = state.auth.tokens().blacklist().clone();
    let sweep_interval = Duration::from_secs(config.auth.blacklist_sweep_secs);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(sweep_interval);
        loop {
            tick.tick().await;
            let removed = blacklist.sweep(chrono::Utc::now().timestamp());
            if removed > 0 {
                tracing::debug!(removed, "swept expired revocations");
            }
        }
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("gateway listening on {}", addr);

    let router = build_router(state);
    axum::serve(listener, router).await?;
    Ok(())
}
