//! Order finalization.
//!
//! The whole sequence runs inside one [`CheckoutTx`]: the cart rows are
//! locked, the order and its items are written, stock is decremented with a
//! guard, and the cart is emptied. Any failure drops the unit, so a failed
//! checkout leaves cart, stock and orders exactly as they were.

use uuid::Uuid;

use crate::{
    audit::try_log_audit,
    dto::orders::{CheckoutRequest, CheckoutResult},
    error::{AppError, AppResult, CheckoutStage},
    middleware::auth::AuthUser,
    models::{CartLine, Order, OrderItem},
    response::{ApiResponse, Meta},
    services::cart_service::cart_total,
    state::AppState,
    store::{CheckoutTx, NewOrder, NewOrderItem, StoreError},
};

fn stage(stage: CheckoutStage) -> impl FnOnce(StoreError) -> AppError {
    move |source| AppError::CheckoutFailed { stage, source }
}

/// One item per line, priced from the locked product rows.
fn build_items(lines: &[CartLine]) -> Vec<NewOrderItem> {
    lines
        .iter()
        .map(|line| NewOrderItem {
            id: Uuid::new_v4(),
            product_id: line.product.id,
            product_name: line.product.name.clone(),
            quantity: line.quantity,
            unit_price: line.product.price,
        })
        .collect()
}

enum Outcome {
    Created(Order, Vec<OrderItem>),
    Replayed(Order),
}

async fn run(
    tx: &mut Box<dyn CheckoutTx>,
    user_id: Uuid,
    idempotency_key: Uuid,
    replayable: bool,
) -> AppResult<Outcome> {
    // Locks first: a concurrent attempt with the same key blocks here until
    // the first one ends, and the lookup below then sees its order.
    let lines = tx.lock_cart_lines(user_id).await?;
    if replayable {
        if let Some(order) = tx.find_order_by_key(user_id, idempotency_key).await? {
            return Ok(Outcome::Replayed(order));
        }
    }
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let total_amount = cart_total(&lines)?;
    let new_items = build_items(&lines);

    let order = tx
        .insert_order(NewOrder {
            id: Uuid::new_v4(),
            user_id,
            total_amount,
            idempotency_key,
        })
        .await
        .map_err(stage(CheckoutStage::CreateOrder))?;

    let items = tx
        .insert_order_items(order.id, &new_items)
        .await
        .map_err(stage(CheckoutStage::InsertItems))?;

    for line in &lines {
        let decremented = tx
            .decrement_stock(line.product.id, line.quantity)
            .await
            .map_err(stage(CheckoutStage::DecrementStock))?;
        if !decremented {
            return Err(AppError::InsufficientStock {
                product_id: line.product.id,
                available: line.product.stock,
            });
        }
    }

    tx.clear_cart(user_id)
        .await
        .map_err(stage(CheckoutStage::ClearCart))?;

    Ok(Outcome::Created(order, items))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResult>> {
    let replayable = payload.idempotency_key.is_some();
    let idempotency_key = payload.idempotency_key.unwrap_or_else(Uuid::new_v4);

    let mut tx = state.store.begin_checkout().await?;
    let outcome = run(&mut tx, user.user_id, idempotency_key, replayable).await;

    let result = match outcome {
        Ok(Outcome::Created(order, items)) => {
            tx.commit()
                .await
                .map_err(stage(CheckoutStage::Commit))?;
            tracing::info!(
                user_id = %user.user_id,
                order_id = %order.id,
                total = order.total_amount,
                items = items.len(),
                "checkout completed"
            );
            try_log_audit(
                state,
                Some(user.user_id),
                "checkout",
                Some("orders"),
                Some(serde_json::json!({ "order_id": order.id, "total": order.total_amount })),
            )
            .await;
            CheckoutResult {
                order,
                items,
                replayed: false,
            }
        }
        Ok(Outcome::Replayed(order)) => {
            // The unit must end before reading through the store again.
            tx.rollback().await?;
            tracing::info!(user_id = %user.user_id, order_id = %order.id, "checkout replayed");
            let items = state.store.order_items(order.id).await?;
            CheckoutResult {
                order,
                items,
                replayed: true,
            }
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "checkout rollback failed");
            }
            match &err {
                AppError::EmptyCart => {
                    tracing::debug!(user_id = %user.user_id, "checkout on empty cart")
                }
                _ => tracing::warn!(user_id = %user.user_id, error = %err, "checkout aborted"),
            }
            return Err(err);
        }
    };

    let message = if result.replayed {
        "Order already placed"
    } else {
        "Checkout success"
    };
    Ok(ApiResponse::success(message, result, Some(Meta::empty())))
}
