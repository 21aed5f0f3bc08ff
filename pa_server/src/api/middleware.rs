//! Identity-injection middleware for player endpoints.
//!
//! Authentication itself is out of scope for this service: an upstream
//! identity provider terminates the user's credentials at the gateway and
//! forwards a stable numeric user id in the `x-user-id` header. This
//! middleware validates the header's presence and shape and injects the id
//! into request extensions for downstream handlers.
//!
//! # Extracting User ID
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//!
//! async fn protected_handler(Extension(user_id): Extension<i64>) -> String {
//!     format!("Acting as user {}", user_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

/// Header carrying the gateway-verified user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Middleware that requires a gateway-injected user identity.
///
/// # Behavior
///
/// - **Success**: Header present and numeric → injects `user_id: i64` →
///   calls the next handler
/// - **Missing or malformed header**: Returns `401 Unauthorized`
pub async fn identity_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok());

    match user_id {
        Some(user_id) => {
            request.extensions_mut().insert(user_id);
            Ok(next.run(request).await)
        }
        None => Err(StatusCode::UNAUTHORIZED),
    }
}
