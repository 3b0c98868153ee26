use chrono::{DateTime, Utc};

use crate::{
    db_types::{OrderId, TimeSlot},
    errors::SettlementError,
};

/// Exclusive ownership of pickup slots. A slot has at most one owner, and an order owns at most one slot.
#[allow(async_fn_in_trait)]
pub trait SlotManagement: Clone {
    /// Bookings starting in `[from, to)`.
    async fn fetch_bookings_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TimeSlot>, SettlementError>;

    async fn fetch_booking(&self, slot: DateTime<Utc>) -> Result<Option<TimeSlot>, SettlementError>;

    /// Claims `slot` for `order_id` and records it on the order, in a single atomic transaction.
    ///
    /// Fails with `NotFound` if the order does not exist, an `InvariantViolation` if it is not a live pickup order or
    /// already holds a slot, and `ConflictError::SlotTaken` if another order owns the slot.
    async fn book_slot(&self, order_id: &OrderId, slot: DateTime<Utc>) -> Result<TimeSlot, SettlementError>;

    /// Frees `slot` if, and only if, `order_id` owns it, and clears the order's pickup slot.
    async fn release_slot(&self, order_id: &OrderId, slot: DateTime<Utc>) -> Result<TimeSlot, SettlementError>;

    /// Moves the booking of `order_id` from `from` to `to` atomically. If `to` is taken, the original booking is kept.
    ///
    /// Returns the released booking and the new one, in that order.
    async fn rebook_slot(
        &self,
        order_id: &OrderId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(TimeSlot, TimeSlot), SettlementError>;
}
