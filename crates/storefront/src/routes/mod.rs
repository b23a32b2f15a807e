//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Store reachability
//!
//! # Products
//! GET  /products[?type=]       - Product listing
//! GET  /products/{id}          - Product detail
//!
//! # Cart (signed-in)
//! GET  /cart                   - Lines and totals
//! GET  /cart/count             - Badge count
//! GET  /cart/events            - SSE cart snapshots
//! POST /cart/add               - Add or raise a line
//! POST /cart/update            - Set quantity
//! POST /cart/decrement         - Decrement or ask for confirmation
//! POST /cart/remove            - Confirmed removal
//!
//! # Orders (signed-in)
//! POST /checkout               - Place order
//! GET  /orders                 - Order archive
//!
//! # Forms
//! POST /custom-requests        - Bespoke request
//! POST /contact                - Contact message
//!
//! # Reviews
//! GET    /reviews              - All reviews
//! GET    /reviews/mine         - Own review
//! PUT    /reviews/mine         - Create or replace own review
//! DELETE /reviews/mine         - Delete own review
//!
//! # Admin (bearer token)
//! GET    /admin/orders
//! GET    /admin/orders/{id}
//! POST   /admin/orders/{id}/complete
//! GET    /admin/custom-requests
//! GET    /admin/custom-requests/{id}
//! POST   /admin/custom-requests/{id}/process
//! POST   /admin/products
//! PUT    /admin/products/{id}
//! DELETE /admin/products/{id}
//! GET    /admin/messages
//! DELETE /admin/messages/{id}
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod forms;
pub mod orders;
pub mod products;
pub mod reviews;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/count", get(cart::count))
        .route("/events", get(cart::events))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/decrement", post(cart::decrement))
        .route("/remove", post(cart::remove))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new().route("/", get(reviews::index)).route(
        "/mine",
        get(reviews::mine)
            .put(reviews::upsert)
            .delete(reviews::delete),
    )
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::orders))
        .route("/orders/{id}", get(admin::order))
        .route("/orders/{id}/complete", post(admin::complete_order))
        .route("/custom-requests", get(admin::custom_requests))
        .route("/custom-requests/{id}", get(admin::custom_request))
        .route(
            "/custom-requests/{id}/process",
            post(admin::process_request),
        )
        .route("/products", post(admin::create_product))
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/messages", get(admin::messages))
        .route("/messages/{id}", axum::routing::delete(admin::delete_message))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::place_order))
        .route("/orders", get(orders::index))
        .route("/custom-requests", post(forms::custom_request))
        .route("/contact", post(forms::contact))
        .nest("/reviews", review_routes())
        .nest("/admin", admin_routes())
}
