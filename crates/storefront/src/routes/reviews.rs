//! Review route handlers.

use ajeborush_core::{Review, ReviewForm};
use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Every review, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.reviews().list().await?))
}

/// The caller's review.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn mine(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Review>> {
    state
        .reviews()
        .mine(&user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("review".to_string()))
}

/// Create or replace the caller's review.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn upsert(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(form): Json<ReviewForm>,
) -> Result<Json<Review>> {
    Ok(Json(state.reviews().upsert(&user.id, form).await?))
}

/// Delete the caller's review.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<StatusCode> {
    state.reviews().delete(&user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
