//! In-process store used by the test suite and local demos.
//!
//! All tables live behind one async mutex. A checkout unit holds that mutex
//! for its whole lifetime and writes to a staged copy, so units are
//! serialized and an abandoned unit leaves no trace.

use std::{
    collections::HashSet,
    fmt,
    sync::{Arc, Mutex as StdMutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    AuditStore, CartStore, CatalogStore, CheckoutTx, FavoriteStore, NewOrder, NewOrderItem,
    NewPayment, NewProduct, NewProfile, OrderFilter, OrderStore, ProductFilter, ProductPatch,
    ProfilePatch, ProfileStore, StoreError, StoreResult, SupportStore, TicketFilter,
};
use crate::{
    models::{
        AuditEntry, CartEntry, CartLine, Category, Order, OrderItem, PaymentDetail, Product,
        ProductSnapshot, Profile, SupportTicket,
    },
    status::{OrderStatus, Role, TicketStatus},
};

/// Store calls that can be made to fail with [`MemoryStore::fail_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadCatalog,
    WriteCatalog,
    ReadCart,
    WriteCart,
    Favorites,
    ReadOrders,
    WriteOrders,
    BeginCheckout,
    InsertOrder,
    InsertOrderItems,
    DecrementStock,
    ClearCart,
    Commit,
    Profiles,
    Support,
    Audit,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::ReadCatalog => "read_catalog",
            Operation::WriteCatalog => "write_catalog",
            Operation::ReadCart => "read_cart",
            Operation::WriteCart => "write_cart",
            Operation::Favorites => "favorites",
            Operation::ReadOrders => "read_orders",
            Operation::WriteOrders => "write_orders",
            Operation::BeginCheckout => "begin_checkout",
            Operation::InsertOrder => "insert_order",
            Operation::InsertOrderItems => "insert_order_items",
            Operation::DecrementStock => "decrement_stock",
            Operation::ClearCart => "clear_cart",
            Operation::Commit => "commit",
            Operation::Profiles => "profiles",
            Operation::Support => "support",
            Operation::Audit => "audit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
struct Tables {
    profiles: Vec<Profile>,
    categories: Vec<Category>,
    products: Vec<Product>,
    cart: Vec<CartEntry>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    favorites: Vec<(Uuid, Uuid)>,
    payments: Vec<PaymentDetail>,
    tickets: Vec<SupportTicket>,
    audit: Vec<AuditEntry>,
}

impl Tables {
    fn product(&self, id: Uuid) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn cart_lines(&self, user_id: Uuid) -> Vec<CartLine> {
        self.cart
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .filter_map(|entry| {
                self.product(entry.product_id).map(|p| CartLine {
                    product: ProductSnapshot {
                        id: p.id,
                        name: p.name.clone(),
                        price: p.price,
                        image_url: p.image_url.clone(),
                        stock: p.stock,
                    },
                    quantity: entry.quantity,
                })
            })
            .collect()
    }

    fn order_items(&self, order_id: Uuid) -> Vec<OrderItem> {
        self.order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<StdMutex<HashSet<Operation>>>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call that performs `op` fail with
    /// [`StoreError::Unavailable`]. Each armed fault fires once.
    pub fn fail_on(&self, op: Operation) {
        self.faults
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(op);
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.tables.lock().await.audit.clone()
    }

    fn check(&self, op: Operation) -> StoreResult<()> {
        trip(&self.faults, op)
    }
}

fn trip(faults: &StdMutex<HashSet<Operation>>, op: Operation) -> StoreResult<()> {
    let fired = faults
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .remove(&op);
    if fired {
        Err(StoreError::Unavailable(op))
    } else {
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        self.check(Operation::ReadCatalog)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| filter.category_id.is_none() || p.category_id == filter.category_id)
            .filter(|p| filter.max_stock.is_none_or(|max| p.stock <= max))
            .cloned()
            .collect())
    }

    async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        self.check(Operation::ReadCatalog)?;
        Ok(self.tables.lock().await.product(id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> StoreResult<Product> {
        self.check(Operation::WriteCatalog)?;
        let mut tables = self.tables.lock().await;
        if tables.products.iter().any(|p| p.name == product.name) {
            return Err(StoreError::Constraint("products.name"));
        }
        let product = Product {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            image_url: product.image_url,
            category_id: product.category_id,
            created_at: Utc::now(),
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
        self.check(Operation::WriteCatalog)?;
        let mut tables = self.tables.lock().await;
        let Some(product) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = Some(description);
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        if let Some(image_url) = patch.image_url {
            product.image_url = Some(image_url);
        }
        if let Some(category_id) = patch.category_id {
            product.category_id = Some(category_id);
        }
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        self.check(Operation::WriteCatalog)?;
        let mut tables = self.tables.lock().await;
        if tables.order_items.iter().any(|item| item.product_id == id) {
            return Err(StoreError::Constraint("order_items.product_id"));
        }
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        tables.cart.retain(|entry| entry.product_id != id);
        tables.favorites.retain(|(_, product_id)| *product_id != id);
        Ok(tables.products.len() < before)
    }

    async fn adjust_stock(&self, id: Uuid, delta: i32) -> StoreResult<Option<Product>> {
        self.check(Operation::WriteCatalog)?;
        let mut tables = self.tables.lock().await;
        let Some(product) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        match product.stock.checked_add(delta) {
            Some(stock) if stock >= 0 => {
                product.stock = stock;
                Ok(Some(product.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn count_products(&self, created_since: Option<DateTime<Utc>>) -> StoreResult<u64> {
        self.check(Operation::ReadCatalog)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .products
            .iter()
            .filter(|p| created_since.is_none_or(|since| p.created_at >= since))
            .count() as u64)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.check(Operation::ReadCatalog)?;
        let mut categories = self.tables.lock().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_category(&self, name: String) -> StoreResult<Category> {
        self.check(Operation::WriteCatalog)?;
        let mut tables = self.tables.lock().await;
        if tables.categories.iter().any(|c| c.name == name) {
            return Err(StoreError::Constraint("categories.name"));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name,
        };
        tables.categories.push(category.clone());
        Ok(category)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
        self.check(Operation::ReadCart)?;
        Ok(self.tables.lock().await.cart_lines(user_id))
    }

    async fn cart_entry(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<CartEntry>> {
        self.check(Operation::ReadCart)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .cart
            .iter()
            .find(|e| e.user_id == user_id && e.product_id == product_id)
            .cloned())
    }

    async fn upsert_cart_entry(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> StoreResult<CartEntry> {
        self.check(Operation::WriteCart)?;
        let mut tables = self.tables.lock().await;
        if tables.product(product_id).is_none() {
            return Err(StoreError::Constraint("cart_items.product_id"));
        }
        if let Some(entry) = tables
            .cart
            .iter_mut()
            .find(|e| e.user_id == user_id && e.product_id == product_id)
        {
            entry.quantity = quantity;
            return Ok(entry.clone());
        }
        let entry = CartEntry {
            user_id,
            product_id,
            quantity,
        };
        tables.cart.push(entry.clone());
        Ok(entry)
    }

    async fn delete_cart_entry(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        self.check(Operation::WriteCart)?;
        let mut tables = self.tables.lock().await;
        let before = tables.cart.len();
        tables
            .cart
            .retain(|e| !(e.user_id == user_id && e.product_id == product_id));
        Ok(tables.cart.len() < before)
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn favorite_products(&self, user_id: Uuid) -> StoreResult<Vec<Product>> {
        self.check(Operation::Favorites)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .favorites
            .iter()
            .rev()
            .filter(|(owner, _)| *owner == user_id)
            .filter_map(|(_, product_id)| tables.product(*product_id).cloned())
            .collect())
    }

    async fn favorite_ids(&self, user_id: Uuid) -> StoreResult<HashSet<Uuid>> {
        self.check(Operation::Favorites)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .favorites
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, product_id)| *product_id)
            .collect())
    }

    async fn insert_favorite(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        self.check(Operation::Favorites)?;
        let mut tables = self.tables.lock().await;
        if tables.favorites.contains(&(user_id, product_id)) {
            return Ok(false);
        }
        tables.favorites.push((user_id, product_id));
        Ok(true)
    }

    async fn delete_favorite(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<bool> {
        self.check(Operation::Favorites)?;
        let mut tables = self.tables.lock().await;
        let before = tables.favorites.len();
        tables.favorites.retain(|pair| *pair != (user_id, product_id));
        Ok(tables.favorites.len() < before)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
    faults: Arc<StdMutex<HashSet<Operation>>>,
}

#[async_trait]
impl CheckoutTx for MemoryTx {
    async fn find_order_by_key(
        &mut self,
        user_id: Uuid,
        idempotency_key: Uuid,
    ) -> StoreResult<Option<Order>> {
        trip(&self.faults, Operation::ReadOrders)?;
        Ok(self
            .staged
            .orders
            .iter()
            .find(|o| o.user_id == user_id && o.idempotency_key == idempotency_key)
            .cloned())
    }

    async fn lock_cart_lines(&mut self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
        trip(&self.faults, Operation::ReadCart)?;
        Ok(self.staged.cart_lines(user_id))
    }

    async fn insert_order(&mut self, order: NewOrder) -> StoreResult<Order> {
        trip(&self.faults, Operation::InsertOrder)?;
        if self
            .staged
            .orders
            .iter()
            .any(|o| o.user_id == order.user_id && o.idempotency_key == order.idempotency_key)
        {
            return Err(StoreError::Constraint("orders.idempotency_key"));
        }
        let now = Utc::now();
        let order = Order {
            id: order.id,
            user_id: order.user_id,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            idempotency_key: order.idempotency_key,
            created_at: now,
            updated_at: now,
        };
        self.staged.orders.push(order.clone());
        Ok(order)
    }

    async fn insert_order_items(
        &mut self,
        order_id: Uuid,
        items: &[NewOrderItem],
    ) -> StoreResult<Vec<OrderItem>> {
        trip(&self.faults, Operation::InsertOrderItems)?;
        let rows: Vec<OrderItem> = items
            .iter()
            .map(|item| OrderItem {
                id: item.id,
                order_id,
                product_id: item.product_id,
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();
        self.staged.order_items.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn decrement_stock(&mut self, product_id: Uuid, quantity: i32) -> StoreResult<bool> {
        trip(&self.faults, Operation::DecrementStock)?;
        match self.staged.products.iter_mut().find(|p| p.id == product_id) {
            Some(product) if product.stock >= quantity => {
                product.stock -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_cart(&mut self, user_id: Uuid) -> StoreResult<u64> {
        trip(&self.faults, Operation::ClearCart)?;
        let before = self.staged.cart.len();
        self.staged.cart.retain(|e| e.user_id != user_id);
        Ok((before - self.staged.cart.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        trip(&self.faults, Operation::Commit)?;
        let MemoryTx {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn begin_checkout(&self) -> StoreResult<Box<dyn CheckoutTx>> {
        self.check(Operation::BeginCheckout)?;
        let guard = self.tables.clone().lock_owned().await;
        let staged = (*guard).clone();
        Ok(Box::new(MemoryTx {
            guard,
            staged,
            faults: self.faults.clone(),
        }))
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        self.check(Operation::ReadOrders)?;
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| filter.user_id.is_none_or(|id| o.user_id == id))
            .filter(|o| filter.status.is_none_or(|status| o.status == status))
            .filter(|o| filter.created_since.is_none_or(|since| o.created_at >= since))
            .cloned()
            .collect();
        // Insertion order breaks created_at ties.
        if !filter.oldest_first {
            orders.reverse();
        }
        orders.sort_by(|a, b| {
            if filter.oldest_first {
                a.created_at.cmp(&b.created_at)
            } else {
                b.created_at.cmp(&a.created_at)
            }
        });
        Ok(orders)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        self.check(Operation::ReadOrders)?;
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn order_items(&self, order_id: Uuid) -> StoreResult<Vec<OrderItem>> {
        self.check(Operation::ReadOrders)?;
        Ok(self.tables.lock().await.order_items(order_id))
    }

    async fn transition_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<Option<Order>> {
        self.check(Operation::WriteOrders)?;
        let mut tables = self.tables.lock().await;
        match tables
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.status == from)
        {
            Some(order) => {
                order.status = to;
                order.updated_at = Utc::now();
                Ok(Some(order.clone()))
            }
            None => Ok(None),
        }
    }

    async fn record_payment(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        payment: NewPayment,
    ) -> StoreResult<Option<(Order, PaymentDetail)>> {
        self.check(Operation::WriteOrders)?;
        let mut tables = self.tables.lock().await;
        let Some(order) = tables.orders.iter_mut().find(|o| {
            o.id == order_id && o.user_id == user_id && o.status == OrderStatus::Pending
        }) else {
            return Ok(None);
        };
        let now = Utc::now();
        order.status = OrderStatus::Paid;
        order.updated_at = now;
        let order = order.clone();

        let detail = PaymentDetail {
            id: Uuid::new_v4(),
            order_id,
            user_id,
            full_name: payment.full_name,
            address: payment.address,
            city: payment.city,
            postal_code: payment.postal_code,
            email: payment.email,
            method: payment.method,
            phone: payment.phone,
            card_last4: payment.card_last4,
            created_at: now,
        };
        tables.payments.push(detail.clone());
        Ok(Some((order, detail)))
    }

    async fn orders_without_items(&self) -> StoreResult<Vec<Order>> {
        self.check(Operation::ReadOrders)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| !tables.order_items.iter().any(|item| item.order_id == o.id))
            .cloned()
            .collect())
    }

    async fn count_orders(&self, status: Option<OrderStatus>) -> StoreResult<u64> {
        self.check(Operation::ReadOrders)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| status.is_none_or(|s| o.status == s))
            .count() as u64)
    }

    async fn sum_order_totals(&self, status: OrderStatus) -> StoreResult<i64> {
        self.check(Operation::ReadOrders)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.total_amount)
            .sum())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        self.check(Operation::Profiles)?;
        let tables = self.tables.lock().await;
        Ok(tables.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        self.check(Operation::Profiles)?;
        Ok(self.tables.lock().await.profiles.clone())
    }

    async fn insert_profile(&self, profile: NewProfile) -> StoreResult<Profile> {
        self.check(Operation::Profiles)?;
        let mut tables = self.tables.lock().await;
        if tables.profiles.iter().any(|p| p.email == profile.email) {
            return Err(StoreError::Constraint("profiles.email"));
        }
        let profile = Profile {
            id: profile.id,
            full_name: profile.full_name,
            email: profile.email,
            phone: None,
            avatar_url: None,
            role: profile.role,
            created_at: Utc::now(),
        };
        tables.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> StoreResult<Option<Profile>> {
        self.check(Operation::Profiles)?;
        let mut tables = self.tables.lock().await;
        Ok(tables.profiles.iter_mut().find(|p| p.id == id).map(|p| {
            if let Some(full_name) = patch.full_name {
                p.full_name = Some(full_name);
            }
            if let Some(phone) = patch.phone {
                p.phone = Some(phone);
            }
            if let Some(avatar_url) = patch.avatar_url {
                p.avatar_url = Some(avatar_url);
            }
            p.clone()
        }))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> StoreResult<Option<Profile>> {
        self.check(Operation::Profiles)?;
        let mut tables = self.tables.lock().await;
        Ok(tables.profiles.iter_mut().find(|p| p.id == id).map(|p| {
            p.role = role;
            p.clone()
        }))
    }

    async fn delete_profile(&self, id: Uuid) -> StoreResult<bool> {
        self.check(Operation::Profiles)?;
        let mut tables = self.tables.lock().await;
        let before = tables.profiles.len();
        tables.profiles.retain(|p| p.id != id);
        if tables.profiles.len() == before {
            return Ok(false);
        }
        let owned: HashSet<Uuid> = tables
            .orders
            .iter()
            .filter(|o| o.user_id == id)
            .map(|o| o.id)
            .collect();
        tables.orders.retain(|o| o.user_id != id);
        tables.order_items.retain(|i| !owned.contains(&i.order_id));
        tables.payments.retain(|p| p.user_id != id);
        tables.cart.retain(|e| e.user_id != id);
        tables.favorites.retain(|(owner, _)| *owner != id);
        tables.tickets.retain(|t| t.user_id != id);
        Ok(true)
    }

    async fn count_profiles(&self) -> StoreResult<u64> {
        self.check(Operation::Profiles)?;
        Ok(self.tables.lock().await.profiles.len() as u64)
    }
}

#[async_trait]
impl SupportStore for MemoryStore {
    async fn insert_ticket(
        &self,
        user_id: Uuid,
        subject: String,
        message: String,
    ) -> StoreResult<SupportTicket> {
        self.check(Operation::Support)?;
        let ticket = SupportTicket {
            id: Uuid::new_v4(),
            user_id,
            subject,
            message,
            status: TicketStatus::Open,
            created_at: Utc::now(),
        };
        self.tables.lock().await.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn list_tickets(&self, filter: &TicketFilter) -> StoreResult<Vec<SupportTicket>> {
        self.check(Operation::Support)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .tickets
            .iter()
            .rev()
            .filter(|t| filter.user_id.is_none_or(|id| t.user_id == id))
            .filter(|t| filter.status.is_none_or(|status| t.status == status))
            .cloned()
            .collect())
    }

    async fn close_ticket(&self, id: Uuid) -> StoreResult<Option<SupportTicket>> {
        self.check(Operation::Support)?;
        let mut tables = self.tables.lock().await;
        Ok(tables.tickets.iter_mut().find(|t| t.id == id).map(|t| {
            t.status = TicketStatus::Closed;
            t.clone()
        }))
    }

    async fn count_tickets(&self, status: Option<TicketStatus>) -> StoreResult<u64> {
        self.check(Operation::Support)?;
        let tables = self.tables.lock().await;
        Ok(tables
            .tickets
            .iter()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .count() as u64)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn record_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        self.check(Operation::Audit)?;
        self.tables.lock().await.audit.push(entry);
        Ok(())
    }
}
