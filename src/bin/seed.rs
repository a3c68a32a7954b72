use chrono::Duration;
use storefront_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    middleware::auth::AuthConfig,
    status::Role,
    store::{CatalogStore, NewProduct, NewProfile, PgStore, ProductFilter, ProfileStore},
};
use uuid::Uuid;

const CATALOG: &[(&str, &str, &str, i64, i32)] = &[
    ("Leather Belt", "Accessories", "Full-grain leather belt", 15_000, 10),
    ("Wallet", "Accessories", "Bifold leather wallet", 25_000, 3),
    ("Wax Print Shirt", "Clothing", "Cotton shirt, wax print", 18_500, 12),
    ("Canvas Sneakers", "Shoes", "Low-top canvas sneakers", 32_000, 4),
    ("Straw Hat", "Accessories", "Hand-woven straw hat", 7_500, 20),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let orm = orm_from_pool(&pool);
    run_migrations(&orm).await?;
    let store = PgStore::new(pool, orm);

    let admin_id = ensure_profile(&store, "admin@example.com", "Store Admin", Role::Admin).await?;
    let client_id = ensure_profile(&store, "client@example.com", "Demo Client", Role::Client).await?;
    seed_catalog(&store).await?;

    let auth = AuthConfig::new(config.jwt_secret.clone(), config.jwt_audience.clone());
    println!("Seed completed.");
    println!("Admin  {admin_id}: {}", auth.issue(admin_id, Duration::days(7))?);
    println!("Client {client_id}: {}", auth.issue(client_id, Duration::days(7))?);
    Ok(())
}

async fn ensure_profile(
    store: &PgStore,
    email: &str,
    full_name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let existing = store
        .list_profiles()
        .await?
        .into_iter()
        .find(|p| p.email == email);

    let id = match existing {
        Some(profile) => {
            store.set_role(profile.id, role).await?;
            profile.id
        }
        None => {
            store
                .insert_profile(NewProfile {
                    id: Uuid::new_v4(),
                    full_name: Some(full_name.to_string()),
                    email: email.to_string(),
                    role,
                })
                .await?
                .id
        }
    };

    println!("Ensured profile {email} (role={role})");
    Ok(id)
}

async fn seed_catalog(store: &PgStore) -> anyhow::Result<()> {
    let mut categories = store.list_categories().await?;
    let existing: Vec<String> = store
        .list_products(&ProductFilter::default())
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();

    for (name, category, description, price, stock) in CATALOG {
        if existing.iter().any(|n| n == name) {
            continue;
        }
        let category_id = match categories.iter().find(|c| c.name == *category) {
            Some(c) => c.id,
            None => {
                let created = store.insert_category(category.to_string()).await?;
                let id = created.id;
                categories.push(created);
                id
            }
        };
        store
            .insert_product(NewProduct {
                name: name.to_string(),
                description: Some(description.to_string()),
                price: *price,
                stock: *stock,
                image_url: None,
                category_id: Some(category_id),
            })
            .await?;
    }

    println!("Seeded catalog");
    Ok(())
}
