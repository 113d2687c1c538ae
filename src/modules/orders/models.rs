use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ORDERS: &str = "orders";

/// Largest quantity of a single book in one order.
pub const MAX_QUANTITY: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A priced line, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub book_id: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub at: DateTime<Utc>,
    /// User who made the change.
    pub by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub user_id: String,
    pub library_id: String,
    pub items: Vec<OrderItem>,
    pub subtotal_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<String>,
    pub promotion_discount_cents: i64,
    pub points_used: i64,
    pub points_discount_cents: i64,
    pub total_cents: i64,
    pub points_awarded: i64,
    /// Awarded points taken back on cancellation; may be less than awarded.
    #[serde(default)]
    pub points_revoked: i64,
    pub status: OrderStatus,
    pub status_history: Vec<StatusChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CartItem {
    pub book_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutRequest {
    /// Optional guard: every book must belong to this library.
    pub library_id: Option<String>,
    pub items: Vec<CartItem>,
    pub promotion_id: Option<String>,
    #[serde(default)]
    pub points_to_use: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderListParams {
    pub user_id: Option<String>,
    pub library_id: Option<String>,
    pub status: Option<OrderStatus>,
}
