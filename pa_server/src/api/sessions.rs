//! Session API handlers.
//!
//! REST endpoints for session operations:
//! - Listing sessions and entries for dashboards and leaderboards
//! - Creating sessions
//! - Joining with an entry fee debit
//! - Cancelling with per-entry refunds
//! - Submitting scores (settles the session on the filling submission)
//!
//! # Examples
//!
//! Join a session:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/sessions/1/join \
//!   -H "x-user-id: 42"
//! ```
//!
//! Submit a score:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/entries/7/score \
//!   -H "x-user-id: 42" \
//!   -H "Content-Type: application/json" \
//!   -d '{"score": 12}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use prize_arcade::session::{GameSession, SessionConfig, SessionEntry, SessionError, SessionStatus};
use prize_arcade::settlement::{SettlementError, SubmissionResult};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::metrics;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            error: message.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub game_kind: String,
    pub entry_fee: i64,
    pub capacity: i32,
    pub min_score: i64,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub entry_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    pub score: i64,
}

fn session_error_response(err: &SessionError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        SessionError::SessionFull(_) | SessionError::SessionClosed(_) => StatusCode::CONFLICT,
        SessionError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        SessionError::Database(_) | SessionError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, ErrorResponse::new(err.client_message()))
}

fn settlement_error_response(err: &SettlementError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        SettlementError::EntryNotFound(_) => StatusCode::NOT_FOUND,
        SettlementError::AlreadyScored(_) | SettlementError::SessionClosed(_) => {
            StatusCode::CONFLICT
        }
        SettlementError::InvalidScore(_) => StatusCode::BAD_REQUEST,
        SettlementError::Database(_)
        | SettlementError::Ledger(_)
        | SettlementError::Redemption(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, ErrorResponse::new(err.client_message()))
}

/// List sessions, optionally filtered by status.
///
/// Public endpoint for lobby and dashboard views.
///
/// # Query Parameters
///
/// - `status`: `open`, `completed`, or `cancelled` (optional)
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status value
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<Vec<GameSession>>, (StatusCode, Json<ErrorResponse>)> {
    let status = match query.status.as_deref() {
        None => None,
        Some("open") => Some(SessionStatus::Open),
        Some("completed") => Some(SessionStatus::Completed),
        Some("cancelled") => Some(SessionStatus::Cancelled),
        Some(other) => {
            return Err((
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(format!("unknown status filter: {other}")),
            ));
        }
    };

    state
        .repo
        .list_sessions(status)
        .await
        .map(Json)
        .map_err(|e| session_error_response(&e))
}

/// Get detail for a single session.
///
/// # Errors
///
/// - `404 Not Found`: No such session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Result<Json<GameSession>, (StatusCode, Json<ErrorResponse>)> {
    state
        .repo
        .get_session(session_id)
        .await
        .map(Json)
        .map_err(|e| session_error_response(&e))
}

/// List a session's entries in join order (leaderboard view).
pub async fn list_entries(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> Result<Json<Vec<SessionEntry>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .repo
        .list_entries(session_id)
        .await
        .map(Json)
        .map_err(|e| session_error_response(&e))
}

/// Create a new session.
///
/// # Request Body
///
/// ```json
/// {"game_kind": "brick_breaker", "entry_fee": 100, "capacity": 3, "min_score": 5}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid config or limits exceeded
/// - `401 Unauthorized`: Missing identity header
pub async fn create_session(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<GameSession>), (StatusCode, Json<ErrorResponse>)> {
    if request.capacity > state.limits.max_capacity {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(format!(
                "capacity exceeds the allowed maximum of {}",
                state.limits.max_capacity
            )),
        ));
    }
    if request.entry_fee > state.limits.max_entry_fee {
        return Err((
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(format!(
                "entry_fee exceeds the allowed maximum of {}",
                state.limits.max_entry_fee
            )),
        ));
    }

    let config = SessionConfig {
        game_kind: request.game_kind,
        entry_fee: request.entry_fee,
        capacity: request.capacity,
        min_score: request.min_score,
    };

    match state.sessions.create_session(config).await {
        Ok(session) => {
            tracing::info!(user_id, session_id = session.id, "session created");
            metrics::sessions_created_total(&session.game_kind);
            Ok((StatusCode::CREATED, Json(session)))
        }
        Err(e) => Err(session_error_response(&e)),
    }
}

/// Join a session: debits the entry fee and creates an unscored entry.
///
/// # Errors
///
/// - `402 Payment Required`: Balance below the entry fee
/// - `404 Not Found`: No such session
/// - `409 Conflict`: Session full or no longer open
pub async fn join_session(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Path(session_id): Path<i64>,
) -> Result<Json<JoinResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.sessions.join(session_id, user_id).await {
        Ok(entry_id) => {
            metrics::joins_total("ok");
            Ok(Json(JoinResponse { entry_id }))
        }
        Err(e) => {
            metrics::joins_total(match e {
                SessionError::SessionFull(_) => "full",
                SessionError::InsufficientFunds { .. } => "insufficient_funds",
                SessionError::SessionClosed(_) => "closed",
                _ => "error",
            });
            Err(session_error_response(&e))
        }
    }
}

/// Cancel a session and refund every collected entry fee.
///
/// Idempotent: cancelling an already terminal session returns `200 OK`.
pub async fn cancel_session(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Path(session_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    match state.sessions.cancel(session_id).await {
        Ok(()) => {
            tracing::info!(user_id, session_id, "session cancelled");
            Ok(StatusCode::OK)
        }
        Err(e) => Err(session_error_response(&e)),
    }
}

/// Submit a score for an entry.
///
/// When this submission fills the session it also settles it; the response
/// carries the final outcome either way. A submission against an already
/// settled session returns the recorded outcome with `200 OK`.
///
/// # Errors
///
/// - `404 Not Found`: No such entry
/// - `409 Conflict`: Entry already scored, or session cancelled
pub async fn submit_score(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Path(entry_id): Path<i64>,
    Json(request): Json<SubmitScoreRequest>,
) -> Result<Json<SubmissionResult>, (StatusCode, Json<ErrorResponse>)> {
    match state.settlement.submit_score(entry_id, request.score).await {
        Ok(result) => {
            metrics::score_submissions_total(result.qualified);
            if result.session_completed {
                metrics::sessions_completed_total(result.winner_user_id.is_some());
            }
            tracing::info!(
                user_id,
                entry_id,
                qualified = result.qualified,
                completed = result.session_completed,
                "score submitted"
            );
            Ok(Json(result))
        }
        Err(e) => Err(settlement_error_response(&e)),
    }
}
