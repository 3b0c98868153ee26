use crate::{
    db_types::{CheckoutId, OrderId, OrderStatus, TimeSlot, VendorOrder},
    errors::SettlementError,
    order_objects::OrderQueryFilter,
    settlement::status_machine::TransitionEffects,
};

/// The order as stored after a status change, and the pickup booking the change released, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdateResult {
    pub order: VendorOrder,
    pub released_slot: Option<TimeSlot>,
}

#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<VendorOrder>, SettlementError>;

    /// All the vendor orders created by one checkout, in the order they were stored.
    async fn fetch_orders_for_checkout(&self, checkout_id: &CheckoutId) -> Result<Vec<VendorOrder>, SettlementError>;

    /// Orders matching every criterion in the filter, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<VendorOrder>, SettlementError>;

    /// Moves `order` to `status` and applies `effects`, in a single atomic transaction.
    ///
    /// The write only succeeds if the stored status still equals `order.status`. If another writer changed it first,
    /// nothing is written and `ConflictError::ConcurrentStatusChange` is returned.
    async fn update_order_status(
        &self,
        order: &VendorOrder,
        status: OrderStatus,
        effects: TransitionEffects,
    ) -> Result<StatusUpdateResult, SettlementError>;
}
