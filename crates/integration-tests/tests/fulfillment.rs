//! Admin fulfilment and the customer-facing order archive.

#![allow(clippy::unwrap_used)]

use ajeborush_core::{
    CustomRequestForm, Email, OrderId, OrderStatus, ProductType, RequestStatus, UserId,
};
use ajeborush_integration_tests::{TestContext, shipping_form, usd};
use ajeborush_storefront::services::FulfillmentError;

async fn place_order(ctx: &TestContext, user: &UserId) -> OrderId {
    let cap = ctx.fashion("cap", "Cap", usd(550), &[]).await;
    ctx.state.cart().upsert_line(user, &cap, None, 1).await.unwrap();
    ctx.state
        .checkout()
        .place_order(user, shipping_form())
        .await
        .unwrap()
        .order
        .id
}

fn request_form(email: &str) -> CustomRequestForm {
    CustomRequestForm {
        name: "Tolu".to_string(),
        email: email.to_string(),
        phone: "+1 555 0100".to_string(),
        category: ProductType::Fashion,
        description: "Matching aso-ebi for six".to_string(),
        attachments: vec!["fabric.jpg".to_string()],
    }
}

#[tokio::test]
async fn test_complete_order_once() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let id = place_order(&ctx, &user).await;

    let completed = ctx.state.fulfillment().complete_order(&id).await.unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
    let stamped = completed.fulfilled_at.unwrap();

    // A second completion changes nothing
    let again = ctx.state.fulfillment().complete_order(&id).await.unwrap();
    assert_eq!(again.fulfilled_at, Some(stamped));

    let stored = ctx.state.archive().get_order(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.fulfilled_at, Some(stamped));
    assert_eq!(stored.total_amount, usd(550));
}

#[tokio::test]
async fn test_complete_unknown_order() {
    let ctx = TestContext::new();
    assert!(matches!(
        ctx.state
            .fulfillment()
            .complete_order(&OrderId::new("missing"))
            .await,
        Err(FulfillmentError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_archive_lists_own_orders_newest_first() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let first = place_order(&ctx, &user).await;
    let second = place_order(&ctx, &user).await;
    place_order(&ctx, &UserId::new("someone-else")).await;

    let orders = ctx.state.archive().list_orders(&user).await.unwrap();
    let ids: Vec<_> = orders.iter().map(|o| o.id.clone()).collect();
    assert_eq!(ids, vec![second, first]);

    assert_eq!(ctx.state.archive().all_orders().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_custom_request_lifecycle() {
    let ctx = TestContext::new();

    let submitted = ctx
        .state
        .custom_requests()
        .submit(request_form("tolu@example.com"))
        .await
        .unwrap();
    ctx.state
        .custom_requests()
        .submit(request_form("other@example.com"))
        .await
        .unwrap();
    assert_eq!(submitted.request.status, RequestStatus::Unprocessed);

    let email = Email::parse("tolu@example.com").unwrap();
    let mine = ctx
        .state
        .archive()
        .list_custom_requests(&email)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, submitted.request.id);

    let processed = ctx
        .state
        .fulfillment()
        .process_request(&submitted.request.id)
        .await
        .unwrap();
    assert_eq!(processed.status, RequestStatus::Processed);

    let again = ctx
        .state
        .fulfillment()
        .process_request(&submitted.request.id)
        .await
        .unwrap();
    assert_eq!(again.fulfilled_at, processed.fulfilled_at);
}
