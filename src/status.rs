//! Closed enumerations for order, role, ticket and payment states.
//!
//! Each enum stores a lowercase tag in the database. Parsing also accepts
//! the French labels written by the mobile client (`en cours`, `Payé`,
//! `expédié`, `ouvert`, `clos`) so legacy rows and requests still map onto a
//! known variant. Anything else is rejected.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

macro_rules! string_enum_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Lifecycle of an order: `Pending -> Paid -> Shipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ToSchema)]
#[schema(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
        }
    }

    /// The only state this one may move to, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Paid),
            OrderStatus::Paid => Some(OrderStatus::Shipped),
            OrderStatus::Shipped => None,
        }
    }

    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        self.next() == Some(to)
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "en cours" => Ok(OrderStatus::Pending),
            "paid" | "payé" => Ok(OrderStatus::Paid),
            "shipped" | "expédié" => Ok(OrderStatus::Shipped),
            _ => Err(UnknownVariant::new("order status", s)),
        }
    }
}

string_enum_serde!(OrderStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ToSchema)]
#[schema(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Client,
    Admin,
    Banned,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
            Role::Banned => "banned",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "admin" => Ok(Role::Admin),
            "banned" => Ok(Role::Banned),
            _ => Err(UnknownVariant::new("role", s)),
        }
    }
}

string_enum_serde!(Role);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ToSchema)]
#[schema(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" | "ouvert" => Ok(TicketStatus::Open),
            "closed" | "clos" => Ok(TicketStatus::Closed),
            _ => Err(UnknownVariant::new("ticket status", s)),
        }
    }
}

string_enum_serde!(TicketStatus);

/// `om` is Orange Money, `momo` is MTN Mobile Money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
pub enum PaymentMethod {
    #[schema(rename = "om")]
    OrangeMoney,
    #[schema(rename = "momo")]
    MobileMoney,
    #[schema(rename = "card")]
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::OrangeMoney => "om",
            PaymentMethod::MobileMoney => "momo",
            PaymentMethod::Card => "card",
        }
    }

    pub fn is_mobile_money(&self) -> bool {
        matches!(self, PaymentMethod::OrangeMoney | PaymentMethod::MobileMoney)
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "om" => Ok(PaymentMethod::OrangeMoney),
            "momo" => Ok(PaymentMethod::MobileMoney),
            "card" => Ok(PaymentMethod::Card),
            _ => Err(UnknownVariant::new("payment method", s)),
        }
    }
}

string_enum_serde!(PaymentMethod);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_moves_forward_one_step_at_a_time() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Paid));
        assert_eq!(OrderStatus::Shipped.next(), None);
    }

    #[test]
    fn legacy_labels_parse_to_known_variants() {
        assert_eq!("en cours".parse::<OrderStatus>(), Ok(OrderStatus::Pending));
        assert_eq!("Payé".parse::<OrderStatus>(), Ok(OrderStatus::Paid));
        assert_eq!("expédié".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert_eq!("ouvert".parse::<TicketStatus>(), Ok(TicketStatus::Open));
        assert_eq!("clos".parse::<TicketStatus>(), Ok(TicketStatus::Closed));
    }

    #[test]
    fn unknown_values_are_rejected() {
        let err = "refunded".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert!("superuser".parse::<Role>().is_err());
        assert!("paypal".parse::<PaymentMethod>().is_err());
        assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    }

    #[test]
    fn serializes_as_storage_tag() {
        assert_eq!(serde_json::to_string(&OrderStatus::Paid).unwrap(), "\"paid\"");
        assert_eq!(serde_json::to_string(&PaymentMethod::MobileMoney).unwrap(), "\"momo\"");
        assert_eq!(serde_json::from_str::<Role>("\"banned\"").unwrap(), Role::Banned);
    }
}
