use std::collections::HashSet;

use uuid::Uuid;

use crate::{
    audit::try_log_audit,
    dto::products::{
        CatalogProduct, CategoryList, CreateCategoryRequest, CreateProductRequest, ProductList,
        UpdateProductRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
    store::{NewProduct, ProductFilter, ProductPatch},
};

/// Case-insensitive substring match on the product name. A blank term keeps
/// everything.
pub fn filter_by_name(products: Vec<Product>, term: &str) -> Vec<Product> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return products;
    }
    products
        .into_iter()
        .filter(|p| p.name.to_lowercase().contains(&term))
        .collect()
}

fn sort_products(products: &mut [Product], sort_by: ProductSortBy, order: SortOrder) {
    products.sort_by(|a, b| {
        let ord = match sort_by {
            ProductSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            ProductSortBy::Price => a.price.cmp(&b.price),
            ProductSortBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
        .then_with(|| a.id.cmp(&b.id))
    });
}

async fn annotate(
    state: &AppState,
    user: &AuthUser,
    products: Vec<Product>,
) -> AppResult<Vec<CatalogProduct>> {
    let favorites = state.store.favorite_ids(user.user_id).await?;
    let in_cart: HashSet<Uuid> = state
        .store
        .cart_lines(user.user_id)
        .await?
        .into_iter()
        .map(|line| line.product.id)
        .collect();

    Ok(products
        .into_iter()
        .map(|product| CatalogProduct {
            is_favorite: favorites.contains(&product.id),
            in_cart: in_cart.contains(&product.id),
            product,
        })
        .collect())
}

/// One catalog fetch per call; the name filter, price bounds and sorting
/// run over the fetched list.
pub async fn list_products(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let filter = ProductFilter {
        category_id: query.category_id,
        ..Default::default()
    };
    let products = state.store.list_products(&filter).await?;

    let mut products = match query.q.as_deref() {
        Some(term) => filter_by_name(products, term),
        None => products,
    };
    if let Some(min_price) = query.min_price {
        products.retain(|p| p.price >= min_price);
    }
    if let Some(max_price) = query.max_price {
        products.retain(|p| p.price <= max_price);
    }

    sort_products(
        &mut products,
        query.sort_by.unwrap_or_default(),
        query.sort_order.unwrap_or_default(),
    );

    let (page_items, meta) = query.pagination().paginate(products);
    let items = annotate(state, user, page_items).await?;
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<CatalogProduct>> {
    let product = state
        .store
        .get_product(id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut annotated = annotate(state, user, vec![product]).await?;
    let product = annotated.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Product found",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = state.store.list_categories().await?;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

fn validate_price_and_stock(price: Option<i64>, stock: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("price must be >= 0".into()));
    }
    if stock.is_some_and(|s| s < 0) {
        return Err(AppError::BadRequest("stock must be >= 0".into()));
    }
    Ok(())
}

fn non_blank(value: String, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_price_and_stock(Some(payload.price), Some(payload.stock))?;
    let name = non_blank(payload.name, "name")?;

    let product = state
        .store
        .insert_product(NewProduct {
            name,
            description: payload.description,
            price: payload.price,
            stock: payload.stock,
            image_url: payload.image_url,
            category_id: payload.category_id,
        })
        .await?;

    tracing::info!(product_id = %product.id, "product created");
    try_log_audit(
        state,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_price_and_stock(payload.price, payload.stock)?;
    let name = payload.name.map(|n| non_blank(n, "name")).transpose()?;

    let patch = ProductPatch {
        name,
        description: payload.description,
        price: payload.price,
        stock: payload.stock,
        image_url: payload.image_url,
        category_id: payload.category_id,
    };
    let product = state
        .store
        .update_product(id, patch)
        .await?
        .ok_or(AppError::NotFound)?;

    try_log_audit(
        state,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product updated",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    if !state.store.delete_product(id).await? {
        return Err(AppError::NotFound);
    }

    try_log_audit(
        state,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let name = non_blank(payload.name, "name")?;
    let category = state.store.insert_category(name).await?;
    Ok(ApiResponse::success(
        "Category created",
        category,
        Some(Meta::empty()),
    ))
}
