use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CheckoutId, Operator, OrderId, OrderStatus, VendorOrder},
    errors::{NotFoundError, SettlementError},
    events::{EventProducers, OrderStatusChangedEvent, SlotChange, SlotChangedEvent},
    settlement::status_machine::{authorize, validate_transition},
    traits::OrderManagement,
};

/// `OrderFlowApi` moves vendor orders through their delivery or pickup flow.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement
{
    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<VendorOrder, SettlementError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| NotFoundError::Order(order_id.clone()).into())
    }

    /// Every vendor order of a checkout, in the order they were created. This reconstructs the original cart.
    pub async fn orders_for_checkout(&self, checkout_id: &CheckoutId) -> Result<Vec<VendorOrder>, SettlementError> {
        self.db.fetch_orders_for_checkout(checkout_id).await
    }

    /// Moves an order to `to`.
    ///
    /// Orders move forward along their flow, possibly skipping steps, or fail into `disputed`, `refunded` or
    /// `cancelled` from any live status. A pickup order cannot leave `pending` before it has booked a slot. Vendors
    /// may only move their own orders.
    ///
    /// Completing an order settles it: the balance due is taken as paid and the payment is released to the vendor.
    /// Any terminal status releases the order's pickup slot.
    ///
    /// The write only succeeds if the order is still in the status it was read in. If another update got there
    /// first, the call fails with `ConflictError::ConcurrentStatusChange` and nothing changes.
    pub async fn transition_order_status(
        &self,
        order_id: &OrderId,
        to: OrderStatus,
        operator: &Operator,
    ) -> Result<VendorOrder, SettlementError> {
        let order = self.fetch_order(order_id).await?;
        authorize(&order, operator)?;
        let effects = validate_transition(&order, to)?;
        trace!("🔄️📦️ {operator} is moving order {order_id} from {} to {to}", order.status);
        let result = self.db.update_order_status(&order, to, effects).await?;
        let updated = result.order;
        debug!("🔄️📦️ Order {order_id} is now {to}");
        let event = OrderStatusChangedEvent::new(order.status, updated.clone(), operator.clone());
        self.producers.publish_order_status_changed(event).await;
        if let Some(slot) = result.released_slot {
            debug!("🔄️📦️ Pickup slot {} held by order {order_id} is free again", slot.starts_at);
            let event = SlotChangedEvent::new(order_id.clone(), slot, SlotChange::ReleasedOnClose);
            self.producers.publish_slot_changed(event).await;
        }
        Ok(updated)
    }
}
