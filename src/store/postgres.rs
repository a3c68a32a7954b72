//! PostgreSQL store: SeaORM for entity CRUD, transactions and row locks,
//! raw sqlx for the joins and upserts.

use std::{collections::HashSet, str::FromStr};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbErr, EntityTrait,
    FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, SqlErr, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sqlx::FromRow;
use uuid::Uuid;

use super::{
    AuditStore, CartStore, CatalogStore, CheckoutTx, FavoriteStore, NewOrder, NewOrderItem,
    NewPayment, NewProduct, NewProfile, OrderFilter, OrderStore, ProductFilter, ProductPatch,
    ProfilePatch, ProfileStore, StoreError, StoreResult, SupportStore, TicketFilter,
};
use crate::{
    db::{DbPool, OrmConn},
    entity::{
        cart_items::{self, Column as CartCol, Entity as CartItems},
        categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories, Model as CategoryModel},
        favorites::{Column as FavCol, Entity as Favorites},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        payment_details::{ActiveModel as PaymentActive, Model as PaymentModel},
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products, Model as ProductModel},
        profiles::{ActiveModel as ProfileActive, Column as ProfileCol, Entity as Profiles, Model as ProfileModel},
        support_requests::{ActiveModel as TicketActive, Column as TicketCol, Entity as SupportRequests, Model as TicketModel},
    },
    models::{
        AuditEntry, CartEntry, CartLine, Category, Order, OrderItem, PaymentDetail, Product,
        ProductSnapshot, Profile, SupportTicket,
    },
    status::{OrderStatus, Role, TicketStatus},
};

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    orm: OrmConn,
}

impl PgStore {
    pub fn new(pool: DbPool, orm: OrmConn) -> Self {
        Self { pool, orm }
    }
}

fn parse_column<T: FromStr>(column: &'static str, value: &str) -> StoreResult<T> {
    value.parse().map_err(|_| StoreError::InvalidData {
        column,
        value: value.to_string(),
    })
}

/// Maps unique and foreign-key violations to [`StoreError::Constraint`].
fn constraint(table: &'static str) -> impl Fn(DbErr) -> StoreError {
    move |err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_))
        | Some(SqlErr::ForeignKeyConstraintViolation(_)) => StoreError::Constraint(table),
        _ => StoreError::Orm(err),
    }
}

fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        image_url: model.image_url,
        category_id: model.category_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
    }
}

fn order_from_entity(model: OrderModel) -> StoreResult<Order> {
    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        status: parse_column("orders.status", &model.status)?,
        idempotency_key: model.idempotency_key,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        quantity: model.quantity,
        unit_price: model.unit_price,
    }
}

fn payment_from_entity(model: PaymentModel) -> StoreResult<PaymentDetail> {
    Ok(PaymentDetail {
        id: model.id,
        order_id: model.order_id,
        user_id: model.user_id,
        full_name: model.full_name,
        address: model.address,
        city: model.city,
        postal_code: model.postal_code,
        email: model.email,
        method: parse_column("payment_details.method", &model.method)?,
        phone: model.phone,
        card_last4: model.card_last4,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn profile_from_entity(model: ProfileModel) -> StoreResult<Profile> {
    Ok(Profile {
        id: model.id,
        full_name: model.full_name,
        email: model.email,
        phone: model.phone,
        avatar_url: model.avatar_url,
        role: parse_column("profiles.role", &model.role)?,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn ticket_from_entity(model: TicketModel) -> StoreResult<SupportTicket> {
    Ok(SupportTicket {
        id: model.id,
        user_id: model.user_id,
        subject: model.subject,
        message: model.message,
        status: parse_column("support_requests.status", &model.status)?,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

#[derive(FromRow, FromQueryResult)]
struct CartLineRow {
    product_id: Uuid,
    quantity: i32,
    name: String,
    price: i64,
    image_url: Option<String>,
    stock: i32,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine {
            product: ProductSnapshot {
                id: row.product_id,
                name: row.name,
                price: row.price,
                image_url: row.image_url,
                stock: row.stock,
            },
            quantity: row.quantity,
        }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    total_amount: i64,
    status: String,
    idempotency_key: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> StoreResult<Self> {
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            total_amount: row.total_amount,
            status: parse_column("orders.status", &row.status)?,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let mut condition = Condition::all();
        if let Some(category_id) = filter.category_id {
            condition = condition.add(ProdCol::CategoryId.eq(category_id));
        }
        if let Some(max_stock) = filter.max_stock {
            condition = condition.add(ProdCol::Stock.lte(max_stock));
        }

        let products = Products::find()
            .filter(condition)
            .order_by_asc(ProdCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();
        Ok(products)
    }

    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let product = Products::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(product_from_entity);
        Ok(product)
    }

    async fn insert_product(&self, product: NewProduct) -> StoreResult<Product> {
        let active = ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            stock: Set(product.stock),
            image_url: Set(product.image_url),
            category_id: Set(product.category_id),
            created_at: NotSet,
        };
        let model = active
            .insert(&self.orm)
            .await
            .map_err(constraint("products.name"))?;
        Ok(product_from_entity(model))
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
        let Some(existing) = Products::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };

        let mut active: ProductActive = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = patch.price {
            active.price = Set(price);
        }
        if let Some(stock) = patch.stock {
            active.stock = Set(stock);
        }
        if let Some(image_url) = patch.image_url {
            active.image_url = Set(Some(image_url));
        }
        if let Some(category_id) = patch.category_id {
            active.category_id = Set(Some(category_id));
        }

        let model = active
            .update(&self.orm)
            .await
            .map_err(constraint("products.name"))?;
        Ok(Some(product_from_entity(model)))
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        let result = Products::delete_by_id(id)
            .exec(&self.orm)
            .await
            .map_err(constraint("order_items.product_id"))?;
        Ok(result.rows_affected > 0)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> StoreResult<Option<Product>> {
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(delta))
            .filter(ProdCol::Id.eq(id))
            .filter(ProdCol::Stock.gte(-delta))
            .exec(&self.orm)
            .await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get_product(id).await
    }

    async fn count_products(&self, created_since: Option<DateTime<Utc>>) -> StoreResult<u64> {
        let mut finder = Products::find();
        if let Some(since) = created_since {
            finder = finder.filter(ProdCol::CreatedAt.gte(since));
        }
        Ok(finder.count(&self.orm).await?)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = Categories::find()
            .order_by_asc(CategoryCol::Name)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(category_from_entity)
            .collect();
        Ok(categories)
    }

    async fn insert_category(&self, name: String) -> StoreResult<Category> {
        let model = CategoryActive {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await
        .map_err(constraint("categories.name"))?;
        Ok(category_from_entity(model))
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r#"
            SELECT ci.product_id, ci.quantity, p.name, p.price, p.image_url, p.stock
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn cart_entry(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<CartEntry>> {
        let entry = sqlx::query_as::<_, CartEntry>(
            "SELECT user_id, product_id, quantity FROM cart_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn upsert_cart_entry(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> StoreResult<CartEntry> {
        let entry = sqlx::query_as::<_, CartEntry>(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
            RETURNING user_id, product_id, quantity
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn delete_cart_entry(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FavoriteStore for PgStore {
    async fn favorite_products(&self, user_id: Uuid) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.name, p.description, p.price, p.stock, p.image_url, p.category_id, p.created_at
            FROM favorites f
            JOIN products p ON p.id = f.product_id
            WHERE f.user_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn favorite_ids(&self, user_id: Uuid) -> StoreResult<HashSet<Uuid>> {
        let ids = Favorites::find()
            .select_only()
            .column(FavCol::ProductId)
            .filter(FavCol::UserId.eq(user_id))
            .into_tuple::<Uuid>()
            .all(&self.orm)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn insert_favorite(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO favorites (id, user_id, product_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(product_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_favorite(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

struct PgCheckoutTx {
    txn: DatabaseTransaction,
}

#[async_trait]
impl CheckoutTx for PgCheckoutTx {
    async fn find_order_by_key(
        &mut self,
        user_id: Uuid,
        idempotency_key: Uuid,
    ) -> StoreResult<Option<Order>> {
        Orders::find()
            .filter(OrderCol::UserId.eq(user_id))
            .filter(OrderCol::IdempotencyKey.eq(idempotency_key))
            .one(&self.txn)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn lock_cart_lines(&mut self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
        let rows = CartItems::find()
            .select_only()
            .column(CartCol::ProductId)
            .column(CartCol::Quantity)
            .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
            .column_as(ProdCol::Name, "name")
            .column_as(ProdCol::Price, "price")
            .column_as(ProdCol::ImageUrl, "image_url")
            .column_as(ProdCol::Stock, "stock")
            .filter(CartCol::UserId.eq(user_id))
            .order_by_asc(CartCol::CreatedAt)
            .lock(LockType::Update)
            .into_model::<CartLineRow>()
            .all(&self.txn)
            .await?;

        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn insert_order(&mut self, order: NewOrder) -> StoreResult<Order> {
        let model = OrderActive {
            id: Set(order.id),
            user_id: Set(order.user_id),
            total_amount: Set(order.total_amount),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            idempotency_key: Set(order.idempotency_key),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.txn)
        .await
        .map_err(constraint("orders.idempotency_key"))?;
        order_from_entity(model)
    }

    async fn insert_order_items(
        &mut self,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> StoreResult<Vec<OrderItem>> {
        let actives = items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                let position = i32::try_from(position).map_err(|_| StoreError::InvalidData {
                    column: "order_items.position",
                    value: position.to_string(),
                })?;
                Ok(OrderItemActive {
                    id: Set(item.id),
                    order_id: Set(order_id),
                    product_id: Set(item.product_id),
                    product_name: Set(item.product_name.clone()),
                    position: Set(position),
                    quantity: Set(item.quantity),
                    unit_price: Set(item.unit_price),
                    created_at: NotSet,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;
        OrderItems::insert_many(actives)
            .exec_without_returning(&self.txn)
            .await?;

        Ok(items
            .iter()
            .map(|item| OrderItem {
                id: item.id,
                order_id,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect())
    }

    async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> StoreResult<bool> {
        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(quantity))
            .filter(ProdCol::Id.eq(product_id))
            .filter(ProdCol::Stock.gte(quantity))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    async fn clear_cart(&mut self, user_id: Uuid) -> StoreResult<u64> {
        let result = CartItems::delete_many()
            .filter(CartCol::UserId.eq(user_id))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.txn.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn begin_checkout(&self) -> StoreResult<Box<dyn CheckoutTx>> {
        let txn = self.orm.begin().await?;
        Ok(Box::new(PgCheckoutTx { txn }))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(OrderCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }
        if let Some(since) = filter.created_since {
            condition = condition.add(OrderCol::CreatedAt.gte(since));
        }

        let mut finder = Orders::find().filter(condition);
        finder = if filter.oldest_first {
            finder.order_by_asc(OrderCol::CreatedAt)
        } else {
            finder.order_by_desc(OrderCol::CreatedAt)
        };

        finder
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_from_entity)
            .collect()
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Orders::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(order_from_entity)
            .transpose()
    }

    async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order_id))
            .order_by_asc(OrderItemCol::Position)
            .all(&self.orm)
            .await?;
        Ok(items.into_iter().map(item_from_entity).collect())
    }

    async fn transition_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<Option<Order>> {
        let result = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(to.as_str()))
            .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(OrderCol::Id.eq(id))
            .filter(OrderCol::Status.eq(from.as_str()))
            .exec(&self.orm)
            .await?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get_order(id).await
    }

    async fn record_payment(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        payment: NewPayment,
    ) -> StoreResult<Option<(Order, PaymentDetail)>> {
        let txn = self.orm.begin().await?;

        let result = Orders::update_many()
            .col_expr(OrderCol::Status, Expr::value(OrderStatus::Paid.as_str()))
            .col_expr(OrderCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(OrderCol::Id.eq(order_id))
            .filter(OrderCol::UserId.eq(user_id))
            .filter(OrderCol::Status.eq(OrderStatus::Pending.as_str()))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let detail = PaymentActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            user_id: Set(user_id),
            full_name: Set(payment.full_name),
            address: Set(payment.address),
            city: Set(payment.city),
            postal_code: Set(payment.postal_code),
            email: Set(payment.email),
            method: Set(payment.method.as_str().to_string()),
            phone: Set(payment.phone),
            card_last4: Set(payment.card_last4),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let Some(order) = Orders::find_by_id(order_id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        txn.commit().await?;
        Ok(Some((order_from_entity(order)?, payment_from_entity(detail)?)))
    }

    async fn orders_without_items(&self) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT o.id, o.user_id, o.total_amount, o.status, o.idempotency_key,
                   o.created_at, o.updated_at
            FROM orders o
            WHERE NOT EXISTS (SELECT 1 FROM order_items oi WHERE oi.order_id = o.id)
            ORDER BY o.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn count_orders(&self, status: Option<OrderStatus>) -> StoreResult<u64> {
        let mut finder = Orders::find();
        if let Some(status) = status {
            finder = finder.filter(OrderCol::Status.eq(status.as_str()));
        }
        Ok(finder.count(&self.orm).await?)
    }

    async fn sum_order_totals(&self, status: OrderStatus) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_amount), 0)::BIGINT FROM orders WHERE status = $1",
        )
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Profiles::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(profile_from_entity)
            .transpose()
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        Profiles::find()
            .order_by_asc(ProfileCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(profile_from_entity)
            .collect()
    }

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile> {
        let model = ProfileActive {
            id: Set(profile.id),
            full_name: Set(profile.full_name),
            email: Set(profile.email),
            phone: NotSet,
            avatar_url: NotSet,
            role: Set(profile.role.as_str().to_string()),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await
        .map_err(constraint("profiles.email"))?;
        profile_from_entity(model)
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> StoreResult<Option<Profile>> {
        let Some(existing) = Profiles::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: ProfileActive = existing.into();
        if let Some(full_name) = patch.full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(avatar_url) = patch.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        let model = active.update(&self.orm).await?;
        profile_from_entity(model).map(Some)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<Option<Profile>> {
        let Some(existing) = Profiles::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: ProfileActive = existing.into();
        active.role = Set(role.as_str().to_string());
        let model = active.update(&self.orm).await?;
        profile_from_entity(model).map(Some)
    }

    async fn delete_profile(&self, id: Uuid) -> StoreResult<bool> {
        let result = Profiles::delete_by_id(id).exec(&self.orm).await?;
        Ok(result.rows_affected > 0)
    }

    async fn count_profiles(&self) -> StoreResult<u64> {
        Ok(Profiles::find().count(&self.orm).await?)
    }
}

#[async_trait]
impl SupportStore for PgStore {
    async fn insert_ticket(
        &self,
        user_id: Uuid,
        subject: String,
        message: String,
    ) -> StoreResult<SupportTicket> {
        let model = TicketActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            subject: Set(subject),
            message: Set(message),
            status: Set(TicketStatus::Open.as_str().to_string()),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        ticket_from_entity(model)
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> StoreResult<Vec<SupportTicket>> {
        let mut condition = Condition::all();
        if let Some(user_id) = filter.user_id {
            condition = condition.add(TicketCol::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(TicketCol::Status.eq(status.as_str()));
        }
        SupportRequests::find()
            .filter(condition)
            .order_by_desc(TicketCol::CreatedAt)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(ticket_from_entity)
            .collect()
    }

    async fn close_ticket(&self, id: Uuid) -> StoreResult<Option<SupportTicket>> {
        let Some(existing) = SupportRequests::find_by_id(id).one(&self.orm).await? else {
            return Ok(None);
        };
        let mut active: TicketActive = existing.into();
        active.status = Set(TicketStatus::Closed.as_str().to_string());
        let model = active.update(&self.orm).await?;
        ticket_from_entity(model).map(Some)
    }

    async fn count_tickets(&self, status: Option<TicketStatus>) -> StoreResult<u64> {
        let mut finder = SupportRequests::find();
        if let Some(status) = status {
            finder = finder.filter(TicketCol::Status.eq(status.as_str()));
        }
        Ok(finder.count(&self.orm).await?)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn record_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, action, resource, metadata)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.user_id)
        .bind(entry.action)
        .bind(entry.resource)
        .bind(entry.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
