//! Order archive for the signed-in customer.

use ajeborush_core::{CustomRequest, Order};
use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Orders plus custom requests sent from the customer's email.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Archive {
    pub orders: Vec<Order>,
    pub custom_requests: Vec<CustomRequest>,
}

/// The customer's history, newest first.
///
/// Custom requests are matched by email, so they are empty when the gateway
/// did not pass one.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Archive>> {
    let orders = state.archive().list_orders(&user.id).await?;
    let custom_requests = match &user.email {
        Some(email) => state.archive().list_custom_requests(email).await?,
        None => Vec::new(),
    };
    Ok(Json(Archive {
        orders,
        custom_requests,
    }))
}
