use serde::{Deserialize, Serialize};

use crate::db_types::{
    CheckoutId,
    Operator,
    OrderId,
    OrderStatus,
    SkippedStockLine,
    StockAdjustment,
    TimeSlot,
    VendorOrder,
    Withdrawal,
};

/// Published once per vendor order after a checkout commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: VendorOrder,
}

impl OrderCreatedEvent {
    pub fn new(order: VendorOrder) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatus,
    pub order: VendorOrder,
    pub changed_by: Operator,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatus, order: VendorOrder, changed_by: Operator) -> Self {
        Self { old_status, order, changed_by }
    }
}

/// Stock levels changed because of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogChangedEvent {
    pub checkout_id: CheckoutId,
    pub adjustments: Vec<StockAdjustment>,
    pub skipped: Vec<SkippedStockLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotChange {
    Booked,
    Released,
    /// Released by the order reaching a terminal status
    ReleasedOnClose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotChangedEvent {
    pub order_id: OrderId,
    pub slot: TimeSlot,
    pub change: SlotChange,
}

impl SlotChangedEvent {
    pub fn new(order_id: OrderId, slot: TimeSlot, change: SlotChange) -> Self {
        Self { order_id, slot, change }
    }
}

/// A withdrawal was requested, approved or rejected. The record carries the new status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalChangedEvent {
    pub withdrawal: Withdrawal,
}

impl WithdrawalChangedEvent {
    pub fn new(withdrawal: Withdrawal) -> Self {
        Self { withdrawal }
    }
}
