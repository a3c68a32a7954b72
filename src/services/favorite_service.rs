use uuid::Uuid;

use crate::{
    dto::favorites::{AddFavoriteRequest, FavoriteProductList, FavoriteState},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_favorites(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<FavoriteProductList>> {
    let products = state.store.favorite_products(user.user_id).await?;
    let (items, meta) = pagination.paginate(products);
    Ok(ApiResponse::success("OK", FavoriteProductList { items }, Some(meta)))
}

async fn ensure_product(state: &AppState, product_id: Uuid) -> AppResult<()> {
    if state.store.get_product(product_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    Ok(())
}

/// Adding an existing favorite is a no-op.
pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    payload: AddFavoriteRequest,
) -> AppResult<ApiResponse<FavoriteState>> {
    ensure_product(state, payload.product_id).await?;
    state
        .store
        .insert_favorite(user.user_id, payload.product_id)
        .await?;
    Ok(ApiResponse::success(
        "Added to favorites",
        FavoriteState {
            product_id: payload.product_id,
            is_favorite: true,
        },
        Some(Meta::empty()),
    ))
}

pub async fn remove_favorite(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<FavoriteState>> {
    state
        .store
        .delete_favorite(user.user_id, product_id)
        .await?;
    Ok(ApiResponse::success(
        "Removed from favorites",
        FavoriteState {
            product_id,
            is_favorite: false,
        },
        Some(Meta::empty()),
    ))
}

/// Flips the stored state, whatever the client believed it was.
pub async fn toggle_favorite(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<FavoriteState>> {
    let removed = state
        .store
        .delete_favorite(user.user_id, product_id)
        .await?;
    let is_favorite = if removed {
        false
    } else {
        ensure_product(state, product_id).await?;
        state.store.insert_favorite(user.user_id, product_id).await?;
        true
    };
    tracing::debug!(user_id = %user.user_id, product_id = %product_id, is_favorite, "favorite toggled");

    let message = if is_favorite {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };
    Ok(ApiResponse::success(
        message,
        FavoriteState {
            product_id,
            is_favorite,
        },
        Some(Meta::empty()),
    ))
}
