//! HTTP/WebSocket API for the arcade server.
//!
//! Exposes the session lifecycle and settlement engine over a versioned
//! REST surface, plus a WebSocket stream of session events for live UIs.
//!
//! # Architecture
//!
//! - **Axum**: async web framework for HTTP/WebSocket
//! - **Tower / tower-http**: middleware (request ids, CORS)
//! - **Gateway identity**: authentication lives upstream; the gateway
//!   injects `x-user-id` (players) or `x-merchant-id` (merchants) and the
//!   API trusts those headers
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET /health` - Server health status
//! - `GET /api/v1/sessions` - List sessions (dashboards)
//! - `GET /api/v1/sessions/{id}` - Session detail
//! - `GET /api/v1/sessions/{id}/entries` - Session entries (leaderboards)
//! - `GET /ws` - WebSocket event stream
//!
//! ## Player identity required (`x-user-id`)
//! - `POST /api/v1/sessions` - Create session
//! - `POST /api/v1/sessions/{id}/join` - Pay the fee and join
//! - `POST /api/v1/sessions/{id}/cancel` - Cancel and refund
//! - `POST /api/v1/entries/{id}/score` - Submit a score
//! - `GET  /api/v1/ledger/balance` - Current balance
//! - `POST /api/v1/ledger/deposit` - Payment on-ramp credit
//!
//! ## Merchant identity required (`x-merchant-id`)
//! - `POST /api/v1/redemptions/redeem` - Consume a prize code
//!
//! Precondition failures surface the module error's client message;
//! lost-race outcomes return `200` with the authoritative result.

pub mod middleware;
pub mod redemptions;
pub mod request_id;
pub mod sessions;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use prize_arcade::db::SessionRepository;
use prize_arcade::ledger::LedgerManager;
use prize_arcade::notify::SessionNotifier;
use prize_arcade::redemption::RedemptionManager;
use prize_arcade::session::SessionManager;
use prize_arcade::settlement::SettlementEngine;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::config::SessionLimits;

/// Application state shared across all handlers and WebSocket connections.
///
/// Cloned per request (cheap due to Arc wrappers).
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub settlement: Arc<SettlementEngine>,
    pub ledger: Arc<LedgerManager>,
    pub redemptions: Arc<RedemptionManager>,
    pub repo: Arc<dyn SessionRepository>,
    pub notifier: SessionNotifier,
    pub limits: SessionLimits,
    pub pool: Arc<PgPool>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router();

    let root_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id::request_id_middleware))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Create the API v1 router with all versioned endpoints.
fn create_v1_router() -> Router<AppState> {
    // Public routes (no identity header required)
    let public_routes = Router::new()
        .route("/sessions", get(sessions::list_sessions))
        .route("/sessions/{session_id}", get(sessions::get_session))
        .route(
            "/sessions/{session_id}/entries",
            get(sessions::list_entries),
        )
        // Merchant identity is checked in the handler itself.
        .route("/redemptions/redeem", post(redemptions::redeem));

    // Player routes (require the gateway-injected user identity)
    let player_routes = Router::new()
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/{session_id}/join", post(sessions::join_session))
        .route(
            "/sessions/{session_id}/cancel",
            post(sessions::cancel_session),
        )
        .route("/entries/{entry_id}/score", post(sessions::submit_score))
        .route("/ledger/balance", get(redemptions::get_balance))
        .route("/ledger/deposit", post(redemptions::deposit))
        .layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new().merge(public_routes).merge(player_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the database answers, `503` otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","database":true,"subscribers":0,"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(state.pool.as_ref())
        .await
        .is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "subscribers": state.notifier.subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
