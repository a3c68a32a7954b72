use uuid::Uuid;

use crate::{
    audit::try_log_audit,
    dto::orders::{OrderList, OrderWithItems, PaidOrder, PayOrderRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Order,
    receipt::Receipt,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::payment_service::validate_payment,
    state::AppState,
    store::OrderFilter,
    status::OrderStatus,
};

pub(crate) async fn with_items(state: &AppState, orders: Vec<Order>) -> AppResult<Vec<OrderWithItems>> {
    let mut out = Vec::with_capacity(orders.len());
    for order in orders {
        let items = state.store.order_items(order.id).await?;
        out.push(OrderWithItems { order, items });
    }
    Ok(out)
}

/// The caller's orders with their items, newest first unless asked otherwise.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let filter = OrderFilter {
        user_id: Some(user.user_id),
        status: query.status,
        oldest_first: matches!(query.sort_order, Some(SortOrder::Asc)),
        ..Default::default()
    };
    let orders = state.store.list_orders(&filter).await?;
    let (page_orders, meta) = query.pagination().paginate(orders);
    let items = with_items(state, page_orders).await?;

    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

async fn owned_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Order> {
    state
        .store
        .get_order(id)
        .await?
        .filter(|order| order.user_id == user.user_id)
        .ok_or(AppError::NotFound)
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = owned_order(state, user, id).await?;
    let items = state.store.order_items(order.id).await?;
    Ok(ApiResponse::success(
        "Order found",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

/// Validates the payment form, then moves the order to paid and stores the
/// masked payment in one unit.
pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: PayOrderRequest,
) -> AppResult<ApiResponse<PaidOrder>> {
    let payment = validate_payment(&payload)?;

    let order = owned_order(state, user, id).await?;
    if order.status != OrderStatus::Pending {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Paid,
        });
    }

    let customer_name = payment.full_name.clone();
    let method = payment.method;
    let Some((order, payment)) = state
        .store
        .record_payment(id, user.user_id, payment)
        .await?
    else {
        // Lost a race with another payment or a status change.
        let current = state
            .store
            .get_order(id)
            .await?
            .ok_or(AppError::NotFound)?;
        return Err(AppError::InvalidTransition {
            from: current.status,
            to: OrderStatus::Paid,
        });
    };

    let items = state.store.order_items(order.id).await?;
    let receipt = Receipt::new(&order, &items, &customer_name);

    tracing::info!(order_id = %order.id, method = %method, "order paid");
    try_log_audit(
        state,
        Some(user.user_id),
        "order_paid",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "method": method.as_str() })),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        PaidOrder {
            order,
            items,
            payment,
            receipt,
        },
        Some(Meta::empty()),
    ))
}
