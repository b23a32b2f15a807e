//! Checkout: turns the signed-in user's cart into an order.

use ajeborush_core::ShippingForm;
use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::services::PlacedOrder;
use crate::state::AppState;

/// Place an order.
///
/// Responds `201` once the order is stored. Cart cleanup or hand-off
/// problems after that point come back as `warnings`.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(form): Json<ShippingForm>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let placed = state.checkout().place_order(&user.id, form).await?;
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_id", placed.order.id.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(placed)))
}
