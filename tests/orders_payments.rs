mod common;

use storefront_api::{
    dto::{
        admin::{InventoryAdjustRequest, LowStockQuery, UpdateOrderStatusRequest},
        orders::{CheckoutRequest, PayOrderRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::Order,
    routes::params::OrderListQuery,
    services::{admin_service, checkout_service, order_service},
    status::{OrderStatus, PaymentMethod},
};

use common::{Fixture, fixture};

fn momo_form() -> PayOrderRequest {
    PayOrderRequest {
        full_name: "Awa Ndiaye".into(),
        address: "12 Rue de la Joie".into(),
        city: "Douala".into(),
        postal_code: "00237".into(),
        email: "awa@example.com".into(),
        method: PaymentMethod::MobileMoney,
        phone: Some("690123456".into()),
        card_number: None,
        card_expiry: None,
        card_cvv: None,
    }
}

async fn placed_order(fx: &Fixture, user: &AuthUser) -> anyhow::Result<Order> {
    let belt = fx.product("Belt", 15_000, 10).await?;
    let wallet = fx.product("Wallet", 25_000, 3).await?;
    fx.add(user, &belt, 2).await?;
    fx.add(user, &wallet, 1).await?;
    let result = checkout_service::checkout(&fx.state, user, CheckoutRequest::default())
        .await?
        .data
        .ok_or_else(|| anyhow::anyhow!("checkout returned no data"))?;
    Ok(result.order)
}

#[tokio::test]
async fn mobile_money_payment_marks_order_paid() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let order = placed_order(&fx, &user).await?;

    let paid = order_service::pay_order(&fx.state, &user, order.id, momo_form())
        .await?
        .data
        .expect("paid order");

    assert_eq!(paid.order.status, OrderStatus::Paid);
    assert_eq!(paid.payment.phone.as_deref(), Some("+237690123456"));
    assert_eq!(paid.payment.card_last4, None);
    assert_eq!(paid.receipt.total, order.total_amount);
    assert_eq!(paid.receipt.total_label, "55 000 FCFA");
    assert_eq!(paid.receipt.lines.len(), 2);
    assert_eq!(paid.receipt.customer_name, "Awa Ndiaye");
    Ok(())
}

#[tokio::test]
async fn card_payment_keeps_only_last_four() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let order = placed_order(&fx, &user).await?;

    let form = PayOrderRequest {
        method: PaymentMethod::Card,
        phone: None,
        card_number: Some("4111 1111 1111 1234".into()),
        card_expiry: Some("09/29".into()),
        card_cvv: Some("123".into()),
        ..momo_form()
    };
    let paid = order_service::pay_order(&fx.state, &user, order.id, form)
        .await?
        .data
        .expect("paid order");
    assert_eq!(paid.payment.card_last4.as_deref(), Some("1234"));
    assert_eq!(paid.payment.phone, None);
    Ok(())
}

#[tokio::test]
async fn invalid_form_leaves_order_pending() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let order = placed_order(&fx, &user).await?;

    let form = PayOrderRequest {
        phone: Some("12ab".into()),
        ..momo_form()
    };
    let err = order_service::pay_order(&fx.state, &user, order.id, form)
        .await
        .expect_err("bad phone");
    assert!(matches!(err, AppError::BadRequest(_)));

    let current = order_service::get_order(&fx.state, &user, order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(current.order.status, OrderStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn paying_twice_is_an_invalid_transition() -> anyhow::Result<()> {
    let fx = fixture();
    let user = fx.client("awa@example.com").await?;
    let order = placed_order(&fx, &user).await?;

    order_service::pay_order(&fx.state, &user, order.id, momo_form()).await?;
    let err = order_service::pay_order(&fx.state, &user, order.id, momo_form())
        .await
        .expect_err("already paid");
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: OrderStatus::Paid,
            to: OrderStatus::Paid
        }
    ));
    Ok(())
}

#[tokio::test]
async fn other_users_orders_are_hidden() -> anyhow::Result<()> {
    let fx = fixture();
    let awa = fx.client("awa@example.com").await?;
    let ben = fx.client("ben@example.com").await?;
    let order = placed_order(&fx, &awa).await?;

    let err = order_service::get_order(&fx.state, &ben, order.id)
        .await
        .expect_err("not ben's order");
    assert!(matches!(err, AppError::NotFound));

    let err = order_service::pay_order(&fx.state, &ben, order.id, momo_form())
        .await
        .expect_err("not ben's order");
    assert!(matches!(err, AppError::NotFound));

    let listed = order_service::list_orders(&fx.state, &ben, OrderListQuery::default())
        .await?
        .data
        .expect("orders");
    assert!(listed.items.is_empty());

    let listed = order_service::list_orders(&fx.state, &awa, OrderListQuery::default())
        .await?
        .data
        .expect("orders");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].items.len(), 2);
    Ok(())
}

#[tokio::test]
async fn admin_moves_orders_forward_only() -> anyhow::Result<()> {
    let fx = fixture();
    let admin = fx.admin("admin@example.com").await?;
    let user = fx.client("awa@example.com").await?;
    let order = placed_order(&fx, &user).await?;

    let err = admin_service::update_order_status(
        &fx.state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await
    .expect_err("pending cannot ship");
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped
        }
    ));

    for status in [OrderStatus::Paid, OrderStatus::Shipped] {
        let updated = admin_service::update_order_status(
            &fx.state,
            &admin,
            order.id,
            UpdateOrderStatusRequest { status },
        )
        .await?
        .data
        .expect("order");
        assert_eq!(updated.status, status);
    }

    let err = admin_service::update_order_status(
        &fx.state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Pending,
        },
    )
    .await
    .expect_err("no going back");
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    let err = admin_service::update_order_status(
        &fx.state,
        &user,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Paid,
        },
    )
    .await
    .expect_err("clients are not admins");
    assert!(matches!(err, AppError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn dashboard_and_finance_count_paid_orders() -> anyhow::Result<()> {
    let fx = fixture();
    let admin = fx.admin("admin@example.com").await?;
    let user = fx.client("awa@example.com").await?;
    let order = placed_order(&fx, &user).await?;

    let stats = admin_service::dashboard(&fx.state, &admin)
        .await?
        .data
        .expect("stats");
    assert_eq!(stats.users, 2);
    assert_eq!(stats.products, 2);
    assert_eq!(stats.new_products, 2);
    assert_eq!(stats.pending_orders, 1);
    assert_eq!(stats.paid_orders, 0);
    assert_eq!(stats.paid_revenue, 0);

    let report = admin_service::finance(&fx.state, &admin)
        .await?
        .data
        .expect("report");
    assert_eq!(report.days.len(), 7);
    assert_eq!(report.total_revenue, 0);

    order_service::pay_order(&fx.state, &user, order.id, momo_form()).await?;

    let stats = admin_service::dashboard(&fx.state, &admin)
        .await?
        .data
        .expect("stats");
    assert_eq!(stats.pending_orders, 0);
    assert_eq!(stats.paid_orders, 1);
    assert_eq!(stats.paid_revenue, 55_000);

    let report = admin_service::finance(&fx.state, &admin)
        .await?
        .data
        .expect("report");
    assert_eq!(report.total_revenue, 55_000);
    assert_eq!(report.total_units, 3);
    let today = report.days.last().expect("today");
    assert_eq!(today.revenue, 55_000);
    Ok(())
}

#[tokio::test]
async fn low_stock_and_inventory_adjustments() -> anyhow::Result<()> {
    let fx = fixture();
    let admin = fx.admin("admin@example.com").await?;
    let wallet = fx.product("Wallet", 25_000, 3).await?;
    fx.product("Belt", 15_000, 10).await?;

    let low = admin_service::list_low_stock(&fx.state, &admin, LowStockQuery::default())
        .await?
        .data
        .expect("low stock");
    assert_eq!(low.items.len(), 1);
    assert_eq!(low.items[0].id, wallet.id);

    let err = admin_service::adjust_inventory(
        &fx.state,
        &admin,
        wallet.id,
        InventoryAdjustRequest { delta: -4 },
    )
    .await
    .expect_err("negative stock");
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(fx.stock(&wallet).await?, 3);

    let updated = admin_service::adjust_inventory(
        &fx.state,
        &admin,
        wallet.id,
        InventoryAdjustRequest { delta: 7 },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(updated.stock, 10);

    let low = admin_service::list_low_stock(&fx.state, &admin, LowStockQuery::default())
        .await?
        .data
        .expect("low stock");
    assert!(low.items.is_empty());
    Ok(())
}
