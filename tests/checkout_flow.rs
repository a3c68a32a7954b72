mod common;

use storefront_api::{
    dto::{orders::CheckoutRequest, products::UpdateProductRequest},
    error::{AppError, CheckoutStage},
    services::{admin_service, cart_service, catalog_service, checkout_service},
    status::OrderStatus,
    store::{CartStore, NewOrder, Operation, OrderFilter, OrderStore},
};
use uuid::Uuid;

use common::fixture;

#[tokio::test]
async fn belt_and_wallet_checkout() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;
    let wallet = fx.product("Wallet", 25_000, 3).await?;

    fx.add(&user, &belt, 2).await?;
    fx.add(&user, &wallet, 1).await?;

    let resp = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default()).await?;
    let result = resp.data.expect("checkout data");

    assert!(!result.replayed);
    assert_eq!(result.order.total_amount, 55_000);
    assert_eq!(result.order.status, OrderStatus::Pending);

    let mut lines: Vec<_> = result
        .items
        .iter()
        .map(|i| (i.product_name.as_str(), i.quantity, i.unit_price))
        .collect();
    lines.sort();
    assert_eq!(lines, vec![("Belt", 2, 15_000), ("Wallet", 1, 25_000)]);

    assert_eq!(fx.stock(&belt).await?, 8);
    assert_eq!(fx.stock(&wallet).await?, 2);
    assert!(fx.store.cart_lines(user.user_id).await?.is_empty());

    let stored = fx.store.order_items(result.order.id).await?;
    assert_eq!(stored.len(), 2);

    let audit = fx.store.audit_entries().await;
    assert!(audit.iter().any(|e| e.action == "checkout"));
    Ok(())
}

#[tokio::test]
async fn order_total_ignores_later_price_changes() -> anyhow::Result<()> {
    let fx = fixture();
    let admin = fx.admin("admin@example.com").await?;
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;
    fx.add(&user, &belt, 3).await?;

    let order = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default())
        .await?
        .data
        .expect("checkout data")
        .order;

    catalog_service::update_product(
        &fx.state,
        &admin,
        belt.id,
        UpdateProductRequest {
            price: Some(99_000),
            ..Default::default()
        },
    )
    .await?;

    let stored = fx.store.get_order(order.id).await?.expect("order");
    assert_eq!(stored.total_amount, 45_000);
    let items = fx.store.order_items(order.id).await?;
    assert_eq!(items[0].unit_price, 15_000);
    assert_eq!(items.iter().map(|i| i.line_total()).sum::<i64>(), 45_000);
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_a_no_op() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;

    let err = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default())
        .await
        .expect_err("empty cart must fail");
    assert!(matches!(err, AppError::EmptyCart));

    assert_eq!(fx.store.count_orders(None).await?, 0);
    assert_eq!(fx.stock(&belt).await?, 10);
    assert!(fx.store.audit_entries().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_item_insert_rolls_everything_back() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;
    let wallet = fx.product("Wallet", 25_000, 3).await?;
    fx.add(&user, &belt, 2).await?;
    fx.add(&user, &wallet, 1).await?;

    fx.store.fail_on(Operation::InsertOrderItems);
    let err = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default())
        .await
        .expect_err("injected failure");
    assert!(matches!(
        err,
        AppError::CheckoutFailed {
            stage: CheckoutStage::InsertItems,
            ..
        }
    ));

    assert_eq!(fx.store.count_orders(None).await?, 0);
    assert!(fx.store.orders_without_items().await?.is_empty());
    assert_eq!(fx.stock(&belt).await?, 10);
    assert_eq!(fx.stock(&wallet).await?, 3);
    assert_eq!(fx.store.cart_lines(user.user_id).await?.len(), 2);

    // The cart is intact, so a retry goes through.
    let order = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default())
        .await?
        .data
        .expect("checkout data")
        .order;
    assert_eq!(order.total_amount, 55_000);
    Ok(())
}

#[tokio::test]
async fn failure_at_each_stage_is_reported_and_rolled_back() -> anyhow::Result<()> {
    let cases = [
        (Operation::InsertOrder, CheckoutStage::CreateOrder),
        (Operation::DecrementStock, CheckoutStage::DecrementStock),
        (Operation::ClearCart, CheckoutStage::ClearCart),
        (Operation::Commit, CheckoutStage::Commit),
    ];

    for (operation, expected) in cases {
        let fx = fixture();
        let user = fx.client("awa@example.com").await?;
        let belt = fx.product("Belt", 15_000, 10).await?;
        fx.add(&user, &belt, 2).await?;

        fx.store.fail_on(operation);
        let err = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default())
            .await
            .expect_err("injected failure");
        match err {
            AppError::CheckoutFailed { stage, .. } => assert_eq!(stage, expected),
            other => panic!("unexpected error for {operation}: {other:?}"),
        }

        assert_eq!(fx.store.count_orders(None).await?, 0, "{operation}");
        assert_eq!(fx.stock(&belt).await?, 10, "{operation}");
        assert_eq!(fx.store.cart_lines(user.user_id).await?.len(), 1, "{operation}");
    }
    Ok(())
}

#[tokio::test]
async fn orders_without_items_are_reported() -> anyhow::Result<()> {
    let fx = fixture();
    let admin = fx.admin("admin@example.com").await?;
    let user = fx.client("awa@example.com").await?;

    // An order header written on its own, the way the old client could
    // leave one behind when its item insert failed.
    let mut tx = fx.store.begin_checkout().await?;
    let orphan = tx
        .insert_order(NewOrder {
            id: Uuid::new_v4(),
            user_id: user.user_id,
            total_amount: 55_000,
            idempotency_key: Uuid::new_v4(),
        })
        .await?;
    tx.commit().await?;

    let stored = fx.store.get_order(orphan.id).await?.expect("orphan order");
    assert_eq!(stored.status, OrderStatus::Pending);
    assert!(fx.store.order_items(orphan.id).await?.is_empty());

    let incomplete = admin_service::list_incomplete_orders(&fx.state, &admin)
        .await?
        .data
        .expect("incomplete orders");
    assert_eq!(incomplete.len(), 1);
    assert_eq!(incomplete[0].id, orphan.id);
    Ok(())
}

#[tokio::test]
async fn stock_lowered_after_adding_fails_checkout() -> anyhow::Result<()> {
    let fx = fixture();
    let admin = fx.admin("admin@example.com").await?;
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;
    let wallet = fx.product("Wallet", 25_000, 3).await?;
    fx.add(&user, &belt, 2).await?;
    fx.add(&user, &wallet, 3).await?;

    catalog_service::update_product(
        &fx.state,
        &admin,
        wallet.id,
        UpdateProductRequest {
            stock: Some(1),
            ..Default::default()
        },
    )
    .await?;

    let err = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default())
        .await
        .expect_err("not enough wallets");
    match err {
        AppError::InsufficientStock {
            product_id,
            available,
        } => {
            assert_eq!(product_id, wallet.id);
            assert_eq!(available, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Belt was decremented inside the unit before the wallet failed.
    assert_eq!(fx.stock(&belt).await?, 10);
    assert_eq!(fx.stock(&wallet).await?, 1);
    assert_eq!(fx.store.count_orders(None).await?, 0);
    assert_eq!(fx.store.cart_lines(user.user_id).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn replay_with_same_key_returns_original_order() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;
    fx.add(&user, &belt, 2).await?;

    let key = Uuid::new_v4();
    let first = checkout_service::checkout(
        &fx.state,
        &user,
        CheckoutRequest {
            idempotency_key: Some(key),
        },
    )
    .await?
    .data
    .expect("first checkout");

    // A new cart line must not leak into the replayed order.
    fx.add(&user, &belt, 1).await?;

    let second = checkout_service::checkout(
        &fx.state,
        &user,
        CheckoutRequest {
            idempotency_key: Some(key),
        },
    )
    .await?
    .data
    .expect("replayed checkout");

    assert!(second.replayed);
    assert_eq!(second.order.id, first.order.id);
    assert_eq!(second.items.len(), 1);
    assert_eq!(fx.stock(&belt).await?, 8);
    assert_eq!(fx.store.count_orders(None).await?, 1);
    assert_eq!(fx.store.cart_lines(user.user_id).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn same_key_from_another_user_is_a_new_order() -> anyhow::Result<()> {
    let fx = fixture();
    let awa = fx.client("awa@example.com").await?;
    let ben = fx.client("ben@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;
    fx.add(&awa, &belt, 1).await?;
    fx.add(&ben, &belt, 1).await?;

    let key = Uuid::new_v4();
    let request = || CheckoutRequest {
        idempotency_key: Some(key),
    };
    let a = checkout_service::checkout(&fx.state, &awa, request()).await?.data.expect("a");
    let b = checkout_service::checkout(&fx.state, &ben, request()).await?.data.expect("b");

    assert!(!b.replayed);
    assert_ne!(a.order.id, b.order.id);
    assert_eq!(fx.stock(&belt).await?, 8);
    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_for_last_unit() -> anyhow::Result<()> {
    let fx = fixture();
    let awa = fx.client("awa@example.com").await?;
    let ben = fx.client("ben@example.com").await?;
    let wallet = fx.product("Wallet", 25_000, 1).await?;
    fx.add(&awa, &wallet, 1).await?;
    fx.add(&ben, &wallet, 1).await?;

    let (a, b) = tokio::join!(
        checkout_service::checkout(&fx.state, &awa, CheckoutRequest::default()),
        checkout_service::checkout(&fx.state, &ben, CheckoutRequest::default()),
    );

    let outcomes = [a, b];
    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
    let out_of_stock = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::InsufficientStock { .. })))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(out_of_stock, 1);
    assert_eq!(fx.stock(&wallet).await?, 0);
    assert_eq!(fx.store.count_orders(None).await?, 1);
    Ok(())
}

#[tokio::test]
async fn audit_failure_does_not_fail_checkout() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;
    fx.add(&user, &belt, 1).await?;

    fx.store.fail_on(Operation::Audit);
    let resp = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default()).await?;
    assert!(resp.data.is_some());
    assert!(fx.store.audit_entries().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn checkout_hands_off_to_order_history() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;

    fx.add(&user, &belt, 1).await?;
    let first = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default())
        .await?
        .data
        .expect("first");
    fx.add(&user, &belt, 2).await?;
    let second = checkout_service::checkout(&fx.state, &user, CheckoutRequest::default())
        .await?
        .data
        .expect("second");

    let orders = fx
        .store
        .list_orders(&OrderFilter {
            user_id: Some(user.user_id),
            ..Default::default()
        })
        .await?;
    assert_eq!(
        orders.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![second.order.id, first.order.id]
    );

    let cart = cart_service::load_cart(&fx.state, &user).await?.data.expect("cart");
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, 0);
    Ok(())
}

#[tokio::test]
async fn retry_after_cart_was_cleared_is_replayed() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let belt = fx.product("Belt", 15_000, 10).await?;
    fx.add(&user, &belt, 1).await?;

    let key = Uuid::new_v4();
    let request = || CheckoutRequest {
        idempotency_key: Some(key),
    };
    let first = checkout_service::checkout(&fx.state, &user, request())
        .await?
        .data
        .expect("first");
    assert!(fx.store.cart_lines(user.user_id).await?.is_empty());

    // The cart is empty now; the key still resolves to the placed order.
    let retry = checkout_service::checkout(&fx.state, &user, request())
        .await?
        .data
        .expect("retry");
    assert!(retry.replayed);
    assert_eq!(retry.order.id, first.order.id);
    assert_eq!(retry.items.len(), 1);
    Ok(())
}
