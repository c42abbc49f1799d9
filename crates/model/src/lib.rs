use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dish — a menu item with a live stock count.
///
/// `quantity` is the number of portions currently available for ordering.
/// It is mutated only by the reservation engine and by direct management
/// edits; the `u32` type rules out negative stock by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dish {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// OrderLine — one dish position inside an order.
///
/// `price` is a snapshot of `dish unit price × quantity` taken when the
/// line was created. It is never recomputed, even if the dish's price
/// changes later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub dish_id: i64,
    pub quantity: u32,
    pub price: Decimal,
}

/// Order — the main aggregate.
///
/// Lines are persisted as separate rows keyed by order id; the store
/// returns orders without lines and the service layer fills them in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: OrderStatus,
    pub special_requests: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

/// The four-state order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

/// Stock side effect of a status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// Decrement dish stock for every line; fails if any dish is short.
    Reserve,
    /// Increment dish stock for every line.
    Release,
    /// No stock movement.
    None,
}

impl OrderStatus {
    /// Completed and Cancelled orders are never picked up by batch
    /// processing again.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Stock side effect of moving an order from `self` to `next`.
    ///
    /// Cancelling an active order puts its reserved portions back on the
    /// shelf; reactivating a terminal order reserves them again. Note the
    /// asymmetry: Completed → Cancelled releases nothing, because a
    /// completed order's portions have already left the kitchen.
    pub fn stock_effect(self, next: OrderStatus) -> StockEffect {
        use OrderStatus::*;
        match (self, next) {
            (Pending | Processing, Cancelled) => StockEffect::Release,
            (Cancelled | Completed, Pending | Processing) => StockEffect::Reserve,
            _ => StockEffect::None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// Error returned when a status string is not one of the four known values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status '{}' is not valid.", self.0)
    }
}

impl std::error::Error for InvalidStatus {}

impl FromStr for OrderStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Processing" => Ok(OrderStatus::Processing),
            "Completed" => Ok(OrderStatus::Completed),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// Request to create an order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: i64,
    /// Validated against the known status set, but the created order always
    /// starts out Pending regardless of what was requested.
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub special_requests: String,
    pub lines: Vec<OrderLineRequest>,
}

fn default_status() -> String {
    "Pending".to_string()
}

/// One dish position in a create-order request.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub dish_id: i64,
    pub quantity: u32,
}

/// Request to create or overwrite a dish.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDishRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub quantity: u32,
}
