use chrono::{Days, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    audit::try_log_audit,
    dto::{
        admin::{
            DashboardStats, FinanceDay, FinanceReport, InventoryAdjustRequest, LowStockQuery,
            ProductList, UpdateOrderStatusRequest, UpdateRoleRequest, UserList,
        },
        orders::{OrderList, OrderWithItems},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, Product, Profile},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::order_service::with_items,
    session::SessionEvent,
    state::AppState,
    status::{OrderStatus, TicketStatus},
    store::{OrderFilter, ProductFilter},
};

pub const LOW_STOCK_THRESHOLD: i32 = 5;
pub const FINANCE_WINDOW_DAYS: u64 = 7;
pub const NEW_PRODUCT_WINDOW_DAYS: i64 = 30;

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let profiles = state.store.list_profiles().await?;
    let (items, meta) = pagination.paginate(profiles);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn set_role(
    state: &AppState,
    user: &AuthUser,
    target: Uuid,
    payload: UpdateRoleRequest,
) -> AppResult<ApiResponse<Profile>> {
    ensure_admin(user)?;
    if target == user.user_id {
        return Err(AppError::BadRequest("cannot change your own role".into()));
    }

    let profile = state
        .store
        .set_role(target, payload.role)
        .await?
        .ok_or(AppError::NotFound)?;

    state.sessions.publish(SessionEvent::RoleChanged {
        user_id: profile.id,
        role: profile.role,
    });
    tracing::info!(admin_id = %user.user_id, user_id = %profile.id, role = %profile.role, "role changed");
    try_log_audit(
        state,
        Some(user.user_id),
        "role_change",
        Some("profiles"),
        Some(serde_json::json!({ "user_id": profile.id, "role": profile.role.as_str() })),
    )
    .await;

    Ok(ApiResponse::success(
        "Role updated",
        profile,
        Some(Meta::empty()),
    ))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    target: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    if target == user.user_id {
        return Err(AppError::BadRequest("cannot delete yourself".into()));
    }

    if !state.store.delete_profile(target).await? {
        return Err(AppError::NotFound);
    }

    state
        .sessions
        .publish(SessionEvent::Removed { user_id: target });
    tracing::info!(admin_id = %user.user_id, user_id = %target, "user removed");
    try_log_audit(
        state,
        Some(user.user_id),
        "user_delete",
        Some("profiles"),
        Some(serde_json::json!({ "user_id": target })),
    )
    .await;

    Ok(ApiResponse::success(
        "User deleted",
        serde_json::json!({ "id": target }),
        Some(Meta::empty()),
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let filter = OrderFilter {
        status: query.status,
        oldest_first: matches!(query.sort_order, Some(SortOrder::Asc)),
        ..Default::default()
    };
    let orders = state.store.list_orders(&filter).await?;
    let (page_orders, meta) = query.pagination().paginate(orders);
    let items = with_items(state, page_orders).await?;
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = state
        .store
        .get_order(id)
        .await?
        .ok_or(AppError::NotFound)?;
    let items = state.store.order_items(order.id).await?;

    Ok(ApiResponse::success(
        "Order found",
        OrderWithItems { order, items },
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let to = payload.status;

    let existing = state
        .store
        .get_order(id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !existing.status.can_transition_to(to) {
        return Err(AppError::InvalidTransition {
            from: existing.status,
            to,
        });
    }

    let Some(order) = state
        .store
        .transition_order(id, existing.status, to)
        .await?
    else {
        let current = state
            .store
            .get_order(id)
            .await?
            .ok_or(AppError::NotFound)?;
        return Err(AppError::InvalidTransition {
            from: current.status,
            to,
        });
    };

    try_log_audit(
        state,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status.as_str() })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order,
        Some(Meta::empty()),
    ))
}

/// Orders that have no line items at all.
pub async fn list_incomplete_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<Vec<Order>>> {
    ensure_admin(user)?;
    let orders = state.store.orders_without_items().await?;
    if !orders.is_empty() {
        tracing::warn!(count = orders.len(), "orders without items found");
    }
    Ok(ApiResponse::success(
        "Incomplete orders",
        orders,
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let threshold = query.threshold.unwrap_or(LOW_STOCK_THRESHOLD);

    let filter = ProductFilter {
        max_stock: Some(threshold),
        ..Default::default()
    };
    let mut products = state.store.list_products(&filter).await?;
    products.sort_by(|a, b| a.stock.cmp(&b.stock).then(b.created_at.cmp(&a.created_at)));

    let pagination = Pagination {
        page: query.page,
        per_page: query.per_page,
    };
    let (items, meta) = pagination.paginate(products);
    Ok(ApiResponse::success("Low stock", ProductList { items }, Some(meta)))
}

pub async fn adjust_inventory(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: InventoryAdjustRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    if payload.delta == 0 {
        return Err(AppError::BadRequest("delta must not be 0".into()));
    }

    if state.store.get_product(id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let updated = state
        .store
        .adjust_stock(id, payload.delta)
        .await?
        .ok_or_else(|| AppError::BadRequest("stock cannot be negative".into()))?;

    try_log_audit(
        state,
        Some(user.user_id),
        "inventory_adjust",
        Some("products"),
        Some(serde_json::json!({ "product_id": updated.id, "delta": payload.delta, "stock": updated.stock })),
    )
    .await;

    Ok(ApiResponse::success(
        "Inventory adjusted",
        updated,
        Some(Meta::empty()),
    ))
}

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;
    let new_since = Utc::now() - Duration::days(NEW_PRODUCT_WINDOW_DAYS);
    let stats = DashboardStats {
        users: state.store.count_profiles().await?,
        products: state.store.count_products(None).await?,
        new_products: state.store.count_products(Some(new_since)).await?,
        pending_orders: state.store.count_orders(Some(OrderStatus::Pending)).await?,
        paid_orders: state.store.count_orders(Some(OrderStatus::Paid)).await?,
        open_tickets: state.store.count_tickets(Some(TicketStatus::Open)).await?,
        paid_revenue: state.store.sum_order_totals(OrderStatus::Paid).await?,
    };
    Ok(ApiResponse::success("Dashboard", stats, Some(Meta::empty())))
}

/// Buckets paid orders by UTC creation day over the window ending `today`.
/// Days without sales are present with zeros.
pub fn finance_report(today: NaiveDate, orders: &[OrderWithItems]) -> FinanceReport {
    let first = today
        .checked_sub_days(Days::new(FINANCE_WINDOW_DAYS - 1))
        .unwrap_or(today);
    let mut days: Vec<FinanceDay> = first
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|date| FinanceDay {
            date,
            revenue: 0,
            units_sold: 0,
        })
        .collect();

    for entry in orders {
        if entry.order.status != OrderStatus::Paid {
            continue;
        }
        let date = entry.order.created_at.date_naive();
        if let Some(day) = days.iter_mut().find(|d| d.date == date) {
            day.revenue += entry.order.total_amount;
            day.units_sold += entry
                .items
                .iter()
                .map(|item| i64::from(item.quantity))
                .sum::<i64>();
        }
    }

    let total_revenue = days.iter().map(|d| d.revenue).sum();
    let total_units = days.iter().map(|d| d.units_sold).sum();
    FinanceReport {
        days,
        total_revenue,
        total_units,
    }
}

pub async fn finance(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<FinanceReport>> {
    ensure_admin(user)?;
    let today = Utc::now().date_naive();
    let since = today
        .checked_sub_days(Days::new(FINANCE_WINDOW_DAYS - 1))
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|start| start.and_utc())
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("finance window out of range")))?;

    let filter = OrderFilter {
        status: Some(OrderStatus::Paid),
        created_since: Some(since),
        oldest_first: true,
        ..Default::default()
    };
    let orders = state.store.list_orders(&filter).await?;
    let orders = with_items(state, orders).await?;

    Ok(ApiResponse::success(
        "Finance",
        finance_report(today, &orders),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::models::OrderItem;

    fn paid_order(day: NaiveDate, total: i64, quantities: &[i32], status: OrderStatus) -> OrderWithItems {
        let created_at = Utc.from_utc_datetime(&day.and_hms_opt(10, 30, 0).unwrap());
        let order = Order {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            total_amount: total,
            status,
            idempotency_key: Uuid::new_v4(),
            created_at,
            updated_at: created_at,
        };
        let items = quantities
            .iter()
            .map(|&quantity| OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                product_id: Uuid::new_v4(),
                product_name: "item".into(),
                quantity,
                unit_price: 1,
            })
            .collect();
        OrderWithItems { order, items }
    }

    #[test]
    fn finance_covers_seven_days_and_skips_unpaid() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let orders = vec![
            paid_order(today, 55_000, &[2, 1], OrderStatus::Paid),
            paid_order(today, 10_000, &[1], OrderStatus::Paid),
            paid_order(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), 7_000, &[4], OrderStatus::Paid),
            paid_order(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(), 99_000, &[9], OrderStatus::Paid),
            paid_order(today, 80_000, &[3], OrderStatus::Pending),
        ];

        let report = finance_report(today, &orders);
        assert_eq!(report.days.len(), 7);
        assert_eq!(report.days[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(report.days[0].revenue, 7_000);
        assert_eq!(report.days[6].revenue, 65_000);
        assert_eq!(report.days[6].units_sold, 4);
        assert_eq!(report.total_revenue, 72_000);
        assert_eq!(report.total_units, 8);
    }
}
