use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{Product, Profile},
    status::{OrderStatus, Role},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub threshold: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<Profile>)]
    pub items: Vec<Profile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub users: u64,
    pub products: u64,
    /// Products created in the last 30 days.
    pub new_products: u64,
    pub pending_orders: u64,
    pub paid_orders: u64,
    pub open_tickets: u64,
    /// Sum of the totals of paid orders.
    pub paid_revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FinanceDay {
    pub date: NaiveDate,
    pub revenue: i64,
    pub units_sold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FinanceReport {
    pub days: Vec<FinanceDay>,
    pub total_revenue: i64,
    pub total_units: i64,
}
