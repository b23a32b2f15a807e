//! Cart route handlers.
//!
//! Every handler acts on the signed-in user's cart. Quantity changes return
//! the refreshed cart so clients can re-render in one round trip.

use std::convert::Infallible;
use std::time::Duration;

use ajeborush_core::cart::{compute_total, item_count};
use ajeborush_core::pricing::default_portion;
use ajeborush_core::{CartLine, LineKey, ProductId, ProductType, Variant, format_usd};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::services::{CartError, CartSubscription, DecrementOutcome};
use crate::state::AppState;

/// Cart snapshot returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    pub formatted_total: String,
    pub item_count: u64,
}

impl From<Vec<CartLine>> for CartView {
    fn from(lines: Vec<CartLine>) -> Self {
        let total = compute_total(&lines);
        Self {
            formatted_total: format_usd(total),
            item_count: item_count(&lines),
            total,
            lines,
        }
    }
}

/// Badge count.
#[derive(Debug, Serialize)]
pub struct CartCount {
    pub count: u64,
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: String,
    #[serde(default)]
    pub variant: Option<Variant>,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

/// Set-quantity request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLine {
    pub line_id: String,
    pub quantity: u32,
}

/// Request naming a single line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRef {
    pub line_id: String,
}

/// Result of a decrement.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum DecrementResponse {
    /// Quantity lowered; the refreshed cart.
    Decremented { cart: CartView },
    /// The line is at one unit. Confirm through `/cart/remove`.
    NeedsConfirmation { line: CartLine },
}

/// Current cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartView>> {
    let lines = state.cart().list_lines(&user.id).await?;
    Ok(Json(CartView::from(lines)))
}

/// Item count for the cart badge.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn count(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartCount>> {
    let lines = state.cart().list_lines(&user.id).await?;
    Ok(Json(CartCount {
        count: item_count(&lines),
    }))
}

/// Add a product to the cart.
///
/// A catering add without a variant takes the pre-selected portion.
#[instrument(skip(state, user, body), fields(user_id = %user.id, product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<AddToCart>,
) -> Result<(StatusCode, Json<CartLine>)> {
    let product_id = ProductId::new(body.product_id);
    let product = state
        .catalog()
        .get(&product_id)
        .await?
        .ok_or(CartError::ProductNotFound(product_id))?;

    let variant = match body.variant {
        None if product.product_type == ProductType::Catering => {
            default_portion(&product).map(Variant::Portion)
        }
        variant => variant,
    };

    let line = state
        .cart()
        .upsert_line(&user.id, &product, variant.as_ref(), body.quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", product.id.as_str()), ("line", line.id.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(line)))
}

/// Set a line's quantity.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<UpdateLine>,
) -> Result<Json<CartView>> {
    let key = LineKey::from(body.line_id);
    state
        .cart()
        .set_line_quantity(&user.id, &key, body.quantity)
        .await?;
    let lines = state.cart().list_lines(&user.id).await?;
    Ok(Json(CartView::from(lines)))
}

/// Lower a line by one unit, or ask for confirmation at one unit.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn decrement(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<LineRef>,
) -> Result<Json<DecrementResponse>> {
    let key = LineKey::from(body.line_id);
    match state.cart().decrement(&user.id, &key).await? {
        DecrementOutcome::Decremented(_) => {
            let lines = state.cart().list_lines(&user.id).await?;
            Ok(Json(DecrementResponse::Decremented {
                cart: CartView::from(lines),
            }))
        }
        DecrementOutcome::NeedsConfirmation(line) => {
            Ok(Json(DecrementResponse::NeedsConfirmation { line }))
        }
    }
}

/// Remove a line after the customer confirmed.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(body): Json<LineRef>,
) -> Result<Json<CartView>> {
    let key = LineKey::from(body.line_id);
    state.cart().remove_line(&user.id, &key).await?;
    let lines = state.cart().list_lines(&user.id).await?;
    Ok(Json(CartView::from(lines)))
}

/// Server-sent cart snapshots.
///
/// Sends the current cart immediately, then a fresh snapshot after every
/// change. Closing the connection drops the subscription.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn events(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let subscription = state.cart().subscribe(&user.id);
    Sse::new(snapshot_stream(subscription)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn snapshot_stream(
    subscription: CartSubscription,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    stream::unfold(subscription, |mut subscription| async move {
        let snapshot = subscription.next().await?;
        let event = match snapshot {
            Ok(lines) => Event::default()
                .event("cart")
                .json_data(CartView::from(lines))
                .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
            Err(e) => {
                tracing::warn!(error = %e, "cart snapshot failed");
                Event::default().event("error").data("cart temporarily unavailable")
            }
        };
        Some((Ok(event), subscription))
    })
}
