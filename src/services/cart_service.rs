use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartView, UpdateCartQuantityRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartLine,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Sum of `price * quantity` over the lines, or `BadRequest` on overflow.
pub fn cart_total(lines: &[CartLine]) -> AppResult<i64> {
    lines.iter().try_fold(0i64, |acc, line| {
        line.line_total()
            .and_then(|total| acc.checked_add(total))
            .ok_or_else(|| AppError::BadRequest("cart total overflows".into()))
    })
}

async fn cart_view(state: &AppState, user_id: Uuid) -> AppResult<CartView> {
    let items = state.store.cart_lines(user_id).await?;
    let total = cart_total(&items)?;
    Ok(CartView { items, total })
}

pub async fn load_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Cart", cart, Some(Meta::empty())))
}

/// Replaces the quantity of an existing line. The stock check here is
/// advisory; checkout re-validates under lock.
pub async fn set_quantity(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartQuantityRequest,
) -> AppResult<ApiResponse<CartView>> {
    let quantity = payload.quantity;
    if quantity < 1 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }

    let product = state
        .store
        .get_product(product_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if quantity > product.stock {
        return Err(AppError::InsufficientStock {
            product_id,
            available: product.stock,
        });
    }

    if state
        .store
        .cart_entry(user.user_id, product_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    state
        .store
        .upsert_cart_entry(user.user_id, product_id, quantity)
        .await?;
    tracing::debug!(user_id = %user.user_id, product_id = %product_id, quantity, "cart quantity set");

    let cart = cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Cart updated", cart, Some(Meta::empty())))
}

/// Adds to the existing quantity, bounded by live stock.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let AddToCartRequest {
        product_id,
        quantity,
    } = payload;
    if quantity < 1 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }

    let product = state
        .store
        .get_product(product_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let existing = state
        .store
        .cart_entry(user.user_id, product_id)
        .await?
        .map(|entry| entry.quantity)
        .unwrap_or(0);
    let wanted = existing
        .checked_add(quantity)
        .ok_or_else(|| AppError::BadRequest("quantity too large".into()))?;
    if wanted > product.stock {
        return Err(AppError::InsufficientStock {
            product_id,
            available: product.stock,
        });
    }

    state
        .store
        .upsert_cart_entry(user.user_id, product_id, wanted)
        .await?;
    tracing::debug!(user_id = %user.user_id, product_id = %product_id, quantity = wanted, "added to cart");

    let cart = cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Added to cart", cart, Some(Meta::empty())))
}

/// Idempotent: removing a product that is not in the cart is not an error.
pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let removed = state
        .store
        .delete_cart_entry(user.user_id, product_id)
        .await?;
    tracing::debug!(user_id = %user.user_id, product_id = %product_id, removed, "cart line removed");

    let cart = cart_view(state, user.user_id).await?;
    Ok(ApiResponse::success("Removed from cart", cart, Some(Meta::empty())))
}
