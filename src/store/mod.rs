//! Data-access seam.
//!
//! Every table family gets its own trait; [`Store`] is the union that the
//! services depend on. [`PgStore`] talks to PostgreSQL, [`MemoryStore`] keeps
//! everything in process and can be told to fail specific operations.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        AuditEntry, CartEntry, CartLine, Category, Order, OrderItem, PaymentDetail, Product,
        Profile, SupportTicket,
    },
    status::{OrderStatus, PaymentMethod, Role, TicketStatus},
};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, Operation};
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Orm(#[from] sea_orm::DbErr),

    #[error("query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("invalid {column} value {value:?}")]
    InvalidData { column: &'static str, value: String },

    #[error("constraint violated on {0}")]
    Constraint(&'static str),

    #[error("store unavailable during {0}")]
    Unavailable(Operation),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub max_stock: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub created_since: Option<DateTime<Utc>>,
    pub oldest_first: bool,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub idempotency_key: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub email: String,
    pub method: PaymentMethod,
    pub phone: Option<String>,
    pub card_last4: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: String,
    pub role: Role,
}

/// Self-service profile edit. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<TicketStatus>,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;
    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn insert_product(&self, product: NewProduct) -> StoreResult<Product>;
    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>>;
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;
    /// Applies `delta` only if the resulting stock stays non-negative.
    async fn adjust_stock(&self, id: Uuid, delta: i32) -> StoreResult<Option<Product>>;
    /// Counts every product, or only those created at or after `created_since`.
    async fn count_products(&self, created_since: Option<DateTime<Utc>>) -> StoreResult<u64>;
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn insert_category(&self, name: String) -> StoreResult<Category>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Cart rows joined to live product fields, oldest first.
    async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>>;
    async fn cart_entry(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<CartEntry>>;
    async fn upsert_cart_entry(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> StoreResult<CartEntry>;
    async fn delete_cart_entry(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn favorite_products(&self, user_id: Uuid) -> StoreResult<Vec<Product>>;
    async fn favorite_ids(&self, user_id: Uuid) -> StoreResult<HashSet<Uuid>>;
    /// Returns `false` when the pair already existed.
    async fn insert_favorite(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;
    async fn delete_favorite(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool>;
}

/// Unit of work for one checkout. Dropping it without `commit` discards
/// every write made through it.
#[async_trait]
pub trait CheckoutTx: Send {
    async fn find_order_by_key(
        &mut self,
        user_id: Uuid,
        idempotency_key: Uuid,
    ) -> StoreResult<Option<Order>>;
    /// Cart lines with their product rows locked until the unit ends.
    async fn lock_cart_lines(&mut self, user_id: Uuid) -> StoreResult<Vec<CartLine>>;
    async fn insert_order(&mut self, order: NewOrder) -> StoreResult<Order>;
    async fn insert_order_items(
        &mut self,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> StoreResult<Vec<OrderItem>>;
    /// `stock = stock - quantity` guarded by `stock >= quantity`.
    /// Returns `false` when the guard rejected the update.
    async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> StoreResult<bool>;
    async fn clear_cart(&mut self, user_id: Uuid) -> StoreResult<u64>;
    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn begin_checkout(&self) -> StoreResult<Box<dyn CheckoutTx>>;
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>>;
    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>>;
    /// Compare-and-set on the status column.
    async fn transition_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<Option<Order>>;
    /// Moves a pending order owned by `user_id` to paid and stores the
    /// payment in one unit. `None` when the order was not pending or not owned.
    async fn record_payment(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        payment: NewPayment,
    ) -> StoreResult<Option<(Order, PaymentDetail)>>;
    async fn orders_without_items(&self) -> StoreResult<Vec<Order>>;
    async fn count_orders(&self, status: Option<OrderStatus>) -> StoreResult<u64>;
    /// Sum of `total_amount` over orders in `status`; zero when there are none.
    async fn sum_order_totals(&self, status: OrderStatus) -> StoreResult<i64>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;
    async fn list_profiles(&self) -> StoreResult<Vec<Profile>>;
    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile>;
    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> StoreResult<Option<Profile>>;
    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<Option<Profile>>;
    async fn delete_profile(&self, id: Uuid) -> StoreResult<bool>;
    async fn count_profiles(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait SupportStore: Send + Sync {
    async fn insert_ticket(
        &self,
        user_id: Uuid,
        subject: String,
        message: String,
    ) -> StoreResult<SupportTicket>;
    async fn list_tickets(&self, filter: &TicketFilter) -> StoreResult<Vec<SupportTicket>>;
    async fn close_ticket(&self, id: Uuid) -> StoreResult<Option<SupportTicket>>;
    async fn count_tickets(&self, status: Option<TicketStatus>) -> StoreResult<u64>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record_audit(&self, entry: AuditEntry) -> StoreResult<()>;
}

pub trait Store:
    CatalogStore + CartStore + FavoriteStore + OrderStore + ProfileStore + SupportStore + AuditStore
{
}

impl<T> Store for T where
    T: CatalogStore
        + CartStore
        + FavoriteStore
        + OrderStore
        + ProfileStore
        + SupportStore
        + AuditStore
{
}
