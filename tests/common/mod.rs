#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Statement};
use storefront_api::{
    db::{create_pool, orm_from_pool, run_migrations},
    dto::cart::AddToCartRequest,
    middleware::auth::{AuthConfig, AuthUser},
    models::Product,
    services::cart_service,
    session::SessionHub,
    state::AppState,
    status::Role,
    store::{CatalogStore, MemoryStore, NewProduct, NewProfile, PgStore, ProfileStore},
};
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub struct Fixture {
    pub state: AppState,
    pub store: MemoryStore,
    pub sessions: SessionHub,
}

pub fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let sessions = SessionHub::new();
    let state = AppState::new(
        Arc::new(store.clone()),
        sessions.clone(),
        AuthConfig::new(JWT_SECRET, None),
    );
    Fixture {
        state,
        store,
        sessions,
    }
}

impl Fixture {
    pub async fn user(&self, email: &str, role: Role) -> anyhow::Result<AuthUser> {
        let profile = self
            .store
            .insert_profile(NewProfile {
                id: Uuid::new_v4(),
                full_name: Some(email.split('@').next().unwrap_or(email).to_string()),
                email: email.to_string(),
                role,
            })
            .await?;
        Ok(AuthUser {
            user_id: profile.id,
            role: profile.role,
        })
    }

    pub async fn client(&self, email: &str) -> anyhow::Result<AuthUser> {
        self.user(email, Role::Client).await
    }

    pub async fn admin(&self, email: &str) -> anyhow::Result<AuthUser> {
        self.user(email, Role::Admin).await
    }

    pub async fn product(&self, name: &str, price: i64, stock: i32) -> anyhow::Result<Product> {
        let product = self
            .store
            .insert_product(NewProduct {
                name: name.to_string(),
                description: None,
                price,
                stock,
                image_url: None,
                category_id: None,
            })
            .await?;
        Ok(product)
    }

    pub async fn add(&self, user: &AuthUser, product: &Product, quantity: i32) -> anyhow::Result<()> {
        cart_service::add_to_cart(
            &self.state,
            user,
            AddToCartRequest {
                product_id: product.id,
                quantity,
            },
        )
        .await?;
        Ok(())
    }

    pub async fn stock(&self, product: &Product) -> anyhow::Result<i32> {
        let current = self
            .store
            .get_product(product.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("product {} vanished", product.id))?;
        Ok(current.stock)
    }
}

/// State backed by Postgres with every table emptied, or `None` when no
/// database is configured and the caller should skip.
pub async fn pg_state() -> anyhow::Result<Option<(AppState, PgStore)>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run Postgres tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    let orm = orm_from_pool(&pool);
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE payment_details, order_items, orders, cart_items, favorites, support_requests, audit_logs, products, categories, profiles RESTART IDENTITY CASCADE",
    ))
    .await?;

    let store = PgStore::new(pool, orm);
    let state = AppState::new(
        Arc::new(store.clone()),
        SessionHub::new(),
        AuthConfig::new(JWT_SECRET, None),
    );
    Ok(Some((state, store)))
}

pub async fn pg_profile(store: &PgStore, role: Role, email: &str) -> anyhow::Result<AuthUser> {
    let profile = store
        .insert_profile(NewProfile {
            id: Uuid::new_v4(),
            full_name: None,
            email: email.to_string(),
            role,
        })
        .await?;
    Ok(AuthUser {
        user_id: profile.id,
        role: profile.role,
    })
}
