//! Structured purchase receipt. Rendering to PDF and delivery by e-mail
//! happen on the client.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem};

pub const CURRENCY: &str = "FCFA";

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
    pub unit_price_label: String,
    pub line_total_label: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Receipt {
    pub order_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub customer_name: String,
    pub lines: Vec<ReceiptLine>,
    pub total: i64,
    pub total_label: String,
}

impl Receipt {
    pub fn new(order: &Order, items: &[OrderItem], customer_name: &str) -> Self {
        let lines = items
            .iter()
            .map(|item| {
                let line_total = item.line_total();
                ReceiptLine {
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total,
                    unit_price_label: format_price(item.unit_price),
                    line_total_label: format_price(line_total),
                }
            })
            .collect();

        Self {
            order_id: order.id,
            issued_at: order.updated_at,
            customer_name: customer_name.to_string(),
            lines,
            total: order.total_amount,
            total_label: format_price(order.total_amount),
        }
    }
}

/// `55000` -> `"55 000 FCFA"`.
pub fn format_price(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{grouped} {CURRENCY}")
}
