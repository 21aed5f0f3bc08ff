//! Redemption and ledger API handlers.
//!
//! - `POST /redemptions/redeem`: a partner merchant consumes a prize code
//! - `GET  /ledger/balance`: a player's current balance
//! - `POST /ledger/deposit`: the payment on-ramp credits settled funds
//!
//! Merchants authenticate at the gateway like players do, but arrive with
//! an `x-merchant-id` header instead of a user id.

use axum::{
    Json,
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
};
use prize_arcade::ledger::{EntryType, LedgerError};
use prize_arcade::redemption::RedemptionError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use super::sessions::ErrorResponse;
use crate::metrics;

/// Header carrying the gateway-verified merchant id.
pub const MERCHANT_ID_HEADER: &str = "x-merchant-id";

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: i64,
    /// Supplied by the payment processor so retried webhooks stay
    /// exactly-once; generated when absent.
    pub idempotency_key: Option<String>,
}

fn ledger_error_response(err: &LedgerError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        LedgerError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        LedgerError::DuplicateTransaction(_) => StatusCode::CONFLICT,
        LedgerError::InvalidAmount(_) | LedgerError::BalanceOverflow => StatusCode::BAD_REQUEST,
        LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, ErrorResponse::new(err.client_message()))
}

/// Redeem a prize code on behalf of a merchant.
///
/// Exactly one call per code succeeds; the merchant should honor the
/// returned amount. Replays fail with `409 Conflict`.
///
/// # Request Headers
///
/// - `x-merchant-id`: gateway-verified merchant identity (required)
///
/// # Errors
///
/// - `401 Unauthorized`: Missing merchant header
/// - `404 Not Found`: Unknown code
/// - `409 Conflict`: Code already redeemed
pub async fn redeem(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, (StatusCode, Json<ErrorResponse>)> {
    let merchant_id = headers
        .get(MERCHANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    let merchant_id = match merchant_id {
        Some(id) => id,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("missing merchant identity"),
            ));
        }
    };

    match state.redemptions.redeem(&request.code, merchant_id).await {
        Ok(amount) => {
            metrics::redemptions_total("ok");
            tracing::info!(merchant_id, amount, "code redeemed");
            Ok(Json(RedeemResponse { amount }))
        }
        Err(e) => {
            let status = match &e {
                RedemptionError::NotFound => {
                    metrics::redemptions_total("not_found");
                    StatusCode::NOT_FOUND
                }
                RedemptionError::AlreadyRedeemed => {
                    metrics::redemptions_total("already_redeemed");
                    StatusCode::CONFLICT
                }
                RedemptionError::CodeAlreadyIssued(_) | RedemptionError::InvalidAmount(_) => {
                    StatusCode::BAD_REQUEST
                }
                RedemptionError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, ErrorResponse::new(e.client_message())))
        }
    }
}

/// Get the calling player's current balance.
///
/// # Errors
///
/// - `404 Not Found`: No ledger account yet
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
) -> Result<Json<BalanceResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.ledger.get_account(user_id).await {
        Ok(account) => Ok(Json(BalanceResponse {
            user_id: account.user_id,
            balance: account.balance,
        })),
        Err(e) => Err(ledger_error_response(&e)),
    }
}

/// Credit externally settled funds to the calling player.
///
/// This is the boundary the payment on-ramp calls after card processing
/// completes; the processing itself happens elsewhere.
///
/// # Request Body
///
/// ```json
/// {"amount": 1000, "idempotency_key": "psp_evt_8f3a"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Non-positive amount
/// - `409 Conflict`: Idempotency key already applied
pub async fn deposit(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, (StatusCode, Json<ErrorResponse>)> {
    if let Err(e) = state.ledger.open_account(user_id).await {
        return Err(ledger_error_response(&e));
    }

    let idempotency_key = request
        .idempotency_key
        .unwrap_or_else(|| format!("deposit_{}_{}", user_id, Uuid::new_v4()));

    match state
        .ledger
        .credit(
            user_id,
            request.amount,
            None,
            EntryType::Deposit,
            idempotency_key,
            Some("External deposit".to_string()),
        )
        .await
    {
        Ok(balance) => {
            tracing::info!(user_id, amount = request.amount, "deposit credited");
            Ok(Json(BalanceResponse { user_id, balance }))
        }
        Err(e) => Err(ledger_error_response(&e)),
    }
}
