//! Public form submissions: bespoke custom requests and the contact form.
//!
//! Neither needs a signed-in user.

use ajeborush_core::{ContactForm, ContactMessage, CustomRequestForm};
use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use crate::error::Result;
use crate::services::SubmittedRequest;
use crate::state::AppState;

/// Submit a bespoke custom request.
#[instrument(skip(state, form))]
pub async fn custom_request(
    State(state): State<AppState>,
    Json(form): Json<CustomRequestForm>,
) -> Result<(StatusCode, Json<SubmittedRequest>)> {
    let submitted = state.custom_requests().submit(form).await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

/// Leave a contact message.
#[instrument(skip(state, form))]
pub async fn contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<ContactMessage>)> {
    let message = state.inbox().submit(form).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
