use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, StatusHistoryEntry};
use crate::status::OrderStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub delivery_address_id: Uuid,
    pub payment_method_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// Item snapshot total plus delivery fee; `order.total_amount` excludes the fee.
    pub grand_total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    /// One order per shop represented in the cart.
    pub orders: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceOrderRequest {
    /// Target status; must be the immediate successor of the current one.
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusHistoryList {
    pub items: Vec<StatusHistoryEntry>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct ContactInfo {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct DeliveryAddressInfo {
    pub label: String,
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MerchantOrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub grand_total: i64,
    pub customer: ContactInfo,
    pub delivery_address: DeliveryAddressInfo,
    pub history: Vec<StatusHistoryEntry>,
}

/// An unclaimed ready order as shown in the driver queue.
#[derive(Debug, Serialize, ToSchema)]
pub struct AvailableDelivery {
    pub order: Order,
    pub shop_name: String,
    pub shop_address: String,
    pub delivery_address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailableDeliveryList {
    pub items: Vec<AvailableDelivery>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MerchantStats {
    pub total_orders: i64,
    /// Revenue over delivered orders only (subtotals, fees excluded).
    pub total_revenue: i64,
    pub average_order_value: i64,
    pub by_status: Vec<StatusCount>,
}
