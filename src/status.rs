use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle of an order, from checkout to the customer's door.
///
/// The happy path is a strict linear chain; `Cancelled` is a side exit
/// available to the customer while the order is still `Pending`. Merchants
/// own the first three forward steps, the assigned driver owns the last two,
/// and the `ReadyForPickup -> PickedUp` step happens implicitly when a driver
/// claims the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    ReadyForPickup,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Next status on the linear chain, `None` from terminal states.
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::ReadyForPickup),
            OrderStatus::ReadyForPickup => Some(OrderStatus::PickedUp),
            OrderStatus::PickedUp => Some(OrderStatus::InTransit),
            OrderStatus::InTransit => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// The status this one follows, `None` for chain heads and `Cancelled`.
    pub fn predecessor(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending | OrderStatus::Cancelled => None,
            OrderStatus::Confirmed => Some(OrderStatus::Pending),
            OrderStatus::Preparing => Some(OrderStatus::Confirmed),
            OrderStatus::ReadyForPickup => Some(OrderStatus::Preparing),
            OrderStatus::PickedUp => Some(OrderStatus::ReadyForPickup),
            OrderStatus::InTransit => Some(OrderStatus::PickedUp),
            OrderStatus::Delivered => Some(OrderStatus::InTransit),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Forward step a merchant may take from this status. The merchant's
    /// hand-off ends at `ReadyForPickup`; pickup belongs to the driver queue.
    pub fn merchant_next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::ReadyForPickup),
            _ => None,
        }
    }

    /// Forward step the assigned driver may take from this status.
    pub fn driver_next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::PickedUp => Some(OrderStatus::InTransit),
            OrderStatus::InTransit => Some(OrderStatus::Delivered),
            _ => None,
        }
    }

    /// Whether the customer may still cancel.
    pub fn cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown order status: {0}")]
pub struct ParseOrderStatusError(String);

impl FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready_for_pickup" => Ok(OrderStatus::ReadyForPickup),
            "picked_up" => Ok(OrderStatus::PickedUp),
            "in_transit" => Ok(OrderStatus::InTransit),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ParseOrderStatusError(other.to_string())),
        }
    }
}
