//! Admin route handlers. Every handler requires the admin bearer token.

use ajeborush_core::{
    ContactMessage, CustomRequest, MessageId, Order, OrderId, Product, ProductDraft, ProductId,
    RequestId,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// All orders, newest first.
#[instrument(skip_all)]
pub async fn orders(State(state): State<AppState>, _: RequireAdmin) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.archive().all_orders().await?))
}

/// One order.
#[instrument(skip(state, _admin))]
pub async fn order(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let id = OrderId::new(id);
    state
        .archive()
        .get_order(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// Mark an order completed.
#[instrument(skip(state, _admin))]
pub async fn complete_order(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let order = state.fulfillment().complete_order(&OrderId::new(id)).await?;
    Ok(Json(order))
}

/// All custom requests, newest first.
#[instrument(skip_all)]
pub async fn custom_requests(
    State(state): State<AppState>,
    _: RequireAdmin,
) -> Result<Json<Vec<CustomRequest>>> {
    Ok(Json(state.archive().all_custom_requests().await?))
}

/// One custom request.
#[instrument(skip(state, _admin))]
pub async fn custom_request(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<CustomRequest>> {
    let id = RequestId::new(id);
    state
        .archive()
        .get_custom_request(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("custom request {id}")))
}

/// Mark a custom request processed.
#[instrument(skip(state, _admin))]
pub async fn process_request(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<CustomRequest>> {
    let request = state
        .fulfillment()
        .process_request(&RequestId::new(id))
        .await?;
    Ok(Json(request))
}

/// Create a product.
#[instrument(skip(state, _admin, draft), fields(name = %draft.name))]
pub async fn create_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.catalog().create(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields.
#[instrument(skip(state, _admin, draft))]
pub async fn update_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().update(ProductId::new(id), draft).await?))
}

/// Delete a product.
#[instrument(skip(state, _admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.catalog().delete(&ProductId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Contact inbox, newest first.
#[instrument(skip_all)]
pub async fn messages(
    State(state): State<AppState>,
    _: RequireAdmin,
) -> Result<Json<Vec<ContactMessage>>> {
    Ok(Json(state.inbox().list().await?))
}

/// Delete a contact message.
#[instrument(skip(state, _admin))]
pub async fn delete_message(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.inbox().delete(&MessageId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
