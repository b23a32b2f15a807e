//! Cart lifecycle: adds, price freezing, totals and the decrement gate.

#![allow(clippy::unwrap_used)]

use ajeborush_core::cart::{compute_total, item_count};
use ajeborush_core::pricing::PriceError;
use ajeborush_core::{
    DecrementGate, GateAction, LineKey, Portion, ProductDraft, ProductId, ProductType, UserId,
    Variant,
};
use ajeborush_integration_tests::{TestContext, draft, usd};
use ajeborush_storefront::services::{CartError, DecrementOutcome};
use ajeborush_storefront::store::collections;

// =============================================================================
// Upsert
// =============================================================================

#[tokio::test]
async fn test_repeated_add_merges_and_freezes_price() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let scarf = ctx.fashion("scarf", "Silk Scarf", usd(1000), &["M", "L"]).await;
    let medium = Variant::Size("M".to_string());

    ctx.state
        .cart()
        .upsert_line(&user, &scarf, Some(&medium), 1)
        .await
        .unwrap();

    // Price change between adds
    let repriced = ctx.fashion("scarf", "Silk Scarf", usd(1500), &["M", "L"]).await;
    let line = ctx
        .state
        .cart()
        .upsert_line(&user, &repriced, Some(&medium), 1)
        .await
        .unwrap();

    assert_eq!(line.id, LineKey::from("scarf-M"));
    assert_eq!(line.quantity, 2);
    assert_eq!(line.unit_price, usd(1000));

    let lines = ctx.state.cart().list_lines(&user).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].unit_price, usd(1000));
}

#[tokio::test]
async fn test_sizes_and_portions_are_separate_lines() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let jollof = ctx.catering("jollof", "Jollof", usd(12000), usd(7000)).await;
    let cart = ctx.state.cart();

    cart.upsert_line(&user, &jollof, Some(&Variant::Portion(Portion::Full)), 1)
        .await
        .unwrap();
    cart.upsert_line(&user, &jollof, Some(&Variant::Portion(Portion::Half)), 2)
        .await
        .unwrap();

    let lines = cart.list_lines(&user).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].name, "Jollof (Full)");
    assert_eq!(lines[0].unit_price, usd(12000));
    assert_eq!(lines[1].name, "Jollof (Half)");
    assert_eq!(lines[1].quantity, 2);
    assert_eq!(compute_total(&lines), usd(26000));
}

#[tokio::test]
async fn test_unpriceable_selection_writes_nothing() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let jollof = ctx.catering("jollof", "Jollof", usd(12000), usd(7000)).await;

    let err = ctx
        .state
        .cart()
        .upsert_line(&user, &jollof, None, 1)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CartError::Price(PriceError::PortionRequired { .. })
    ));
    assert_eq!(
        ctx.store.document_count(&collections::cart(&user)).await,
        0
    );
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let ctx = TestContext::new();
    let cap = ctx.fashion("cap", "Cap", usd(550), &[]).await;

    ctx.state
        .cart()
        .upsert_line(&UserId::new("u1"), &cap, None, 1)
        .await
        .unwrap();

    assert!(
        ctx.state
            .cart()
            .list_lines(&UserId::new("u2"))
            .await
            .unwrap()
            .is_empty()
    );
}

// =============================================================================
// Totals
// =============================================================================

#[tokio::test]
async fn test_total_and_count() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let scarf = ctx.fashion("scarf", "Silk Scarf", usd(1000), &[]).await;
    let cap = ctx.fashion("cap", "Cap", usd(550), &[]).await;

    ctx.state.cart().upsert_line(&user, &scarf, None, 2).await.unwrap();
    ctx.state.cart().upsert_line(&user, &cap, None, 1).await.unwrap();

    let lines = ctx.state.cart().list_lines(&user).await.unwrap();
    assert_eq!(compute_total(&lines), usd(2550));
    assert_eq!(item_count(&lines), 3);
}

#[tokio::test]
async fn test_single_priced_catering_needs_no_portion() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let draft = ProductDraft {
        price: Some(usd(450)),
        ..draft("Puff Puff", ProductType::Catering)
    };
    let puff = ctx
        .state
        .catalog()
        .put(ProductId::new("puff"), draft)
        .await
        .unwrap();

    let line = ctx
        .state
        .cart()
        .upsert_line(&user, &puff, None, 3)
        .await
        .unwrap();
    assert_eq!(line.id, LineKey::from("puff"));
    assert_eq!(line.line_total(), usd(1350));
}

// =============================================================================
// Decrement gate
// =============================================================================

#[tokio::test]
async fn test_decrement_to_zero_needs_confirmation() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let cap = ctx.fashion("cap", "Cap", usd(550), &[]).await;
    let cart = ctx.state.cart();
    let key = LineKey::from("cap");

    cart.upsert_line(&user, &cap, None, 2).await.unwrap();

    match cart.decrement(&user, &key).await.unwrap() {
        DecrementOutcome::Decremented(line) => assert_eq!(line.quantity, 1),
        other => panic!("expected decrement, got {other:?}"),
    }

    let at_one = cart.decrement(&user, &key).await.unwrap();
    let DecrementOutcome::NeedsConfirmation(line) = at_one else {
        panic!("expected confirmation request, got {at_one:?}");
    };

    // The client gate drives the confirmed removal
    let mut gate = DecrementGate::new();
    assert_eq!(gate.request(&line), GateAction::AwaitConfirmation);
    let GateAction::Remove(confirmed) = gate.confirm() else {
        panic!("confirm should remove");
    };
    assert_eq!(cart.list_lines(&user).await.unwrap()[0].quantity, 1);

    cart.remove_line(&user, &confirmed).await.unwrap();
    assert!(cart.list_lines(&user).await.unwrap().is_empty());

    // Removing again is a no-op
    cart.remove_line(&user, &confirmed).await.unwrap();
}

#[tokio::test]
async fn test_set_quantity_rejects_zero_and_missing_lines() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let cap = ctx.fashion("cap", "Cap", usd(550), &[]).await;
    let cart = ctx.state.cart();
    cart.upsert_line(&user, &cap, None, 1).await.unwrap();

    assert!(matches!(
        cart.set_line_quantity(&user, &LineKey::from("cap"), 0).await,
        Err(CartError::QuantityBelowMinimum)
    ));
    assert!(matches!(
        cart.set_line_quantity(&user, &LineKey::from("ghost"), 2).await,
        Err(CartError::LineNotFound(_))
    ));

    let line = cart
        .set_line_quantity(&user, &LineKey::from("cap"), 5)
        .await
        .unwrap();
    assert_eq!(line.quantity, 5);
}

// =============================================================================
// Live view
// =============================================================================

#[tokio::test]
async fn test_subscription_sees_changes_and_releases_on_drop() {
    let ctx = TestContext::new();
    let user = UserId::new("u1");
    let cap = ctx.fashion("cap", "Cap", usd(550), &[]).await;

    let mut live = ctx.state.cart().subscribe(&user);
    assert_eq!(ctx.store.subscriber_count(), 1);

    let initial = live.next().await.unwrap().unwrap();
    assert!(initial.is_empty());

    ctx.state.cart().upsert_line(&user, &cap, None, 1).await.unwrap();
    let updated = live.next().await.unwrap().unwrap();
    assert_eq!(updated.len(), 1);

    drop(live);
    assert_eq!(ctx.store.subscriber_count(), 0);
}
