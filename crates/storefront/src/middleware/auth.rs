//! Identity extractors.
//!
//! Customer identity is established upstream by the auth gateway, which sets
//! `x-user-id` (and `x-user-email` when known) on every proxied request.
//! Admin calls carry `Authorization: Bearer <ADMIN_API_TOKEN>`.

use ajeborush_core::{Email, UserId};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use secrecy::ExposeSecret;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Header carrying the signed-in user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the signed-in user's email.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The signed-in customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Option<Email>,
}

/// Extractor that requires a signed-in customer.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.id)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Unauthorized("sign in to continue".to_string()))?;

        // A malformed email header is treated as absent
        let email = parts
            .headers
            .get(USER_EMAIL_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|raw| Email::parse(raw).ok());

        set_sentry_user(&id, email.as_ref().map(Email::as_str));

        Ok(Self(CurrentUser {
            id: UserId::new(id),
            email,
        }))
    }
}

/// Extractor that requires the admin bearer token.
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("admin token required".to_string()))?;

        if !constant_time_compare(token.trim(), state.config().admin_token.expose_secret()) {
            tracing::warn!("rejected admin call with wrong token");
            return Err(AppError::Forbidden("invalid admin token".to_string()));
        }

        Ok(Self)
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
