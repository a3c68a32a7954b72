use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Order, OrderItem, PaymentDetail},
    receipt::Receipt,
    status::PaymentMethod,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Client-generated per attempt. Retrying with the same key returns the
    /// order created by the first attempt.
    pub idempotency_key: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResult {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub replayed: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PayOrderRequest {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub email: String,
    pub method: PaymentMethod,
    pub phone: Option<String>,
    pub card_number: Option<String>,
    pub card_expiry: Option<String>,
    pub card_cvv: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaidOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: PaymentDetail,
    pub receipt: Receipt,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}
