//! Order status transitions.
//!
//! Each delivery method has a linear flow ending in `completed`. An order may jump forward along its flow, but never
//! backward. `disputed`, `refunded` and `cancelled` can be reached from any non-terminal status. Once an order is
//! terminal, it never changes again.
//!
//! | Method   | Flow                                                                   |
//! |----------|------------------------------------------------------------------------|
//! | delivery | pending → processing → processed → shipped → delivered → completed     |
//! | pickup   | pending → processing → pickup-ready → pickup-completed → completed     |
//!
//! A pickup order can only move along its flow while it has a booked slot. Failure statuses need no slot.
use crate::{
    db_types::{DeliveryMethod, Operator, OrderStatus, VendorOrder},
    errors::InvariantViolation,
};

pub const DELIVERY_FLOW: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Processed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Completed,
];

pub const PICKUP_FLOW: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::PickupReady,
    OrderStatus::PickupCompleted,
    OrderStatus::Completed,
];

pub fn flow_for(method: DeliveryMethod) -> &'static [OrderStatus] {
    match method {
        DeliveryMethod::Delivery => &DELIVERY_FLOW,
        DeliveryMethod::Pickup => &PICKUP_FLOW,
    }
}

/// Side effects the storage layer must apply in the same transaction as the status change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionEffects {
    /// Free any pickup slot owned by the order
    pub release_slot: bool,
    /// Collect the balance: `amount_paid = total`, `balance_due = 0` and release the funds to the vendor
    pub settle_payment: bool,
    /// Only write the new status if the order still holds a pickup slot at that moment
    pub require_slot: bool,
}

pub fn validate_transition(order: &VendorOrder, to: OrderStatus) -> Result<TransitionEffects, InvariantViolation> {
    let from = order.status;
    let order_id = order.order_id.clone();
    if from.is_terminal() {
        return Err(InvariantViolation::TerminalOrder { order_id, status: from });
    }
    if from == to {
        return Err(InvariantViolation::NoOpTransition { order_id, status: from });
    }
    let method = order.delivery_method();
    let effects = TransitionEffects {
        release_slot: to.is_terminal(),
        settle_payment: to == OrderStatus::Completed,
        require_slot: method == DeliveryMethod::Pickup && !to.is_failure(),
    };
    if to.is_failure() {
        return Ok(effects);
    }
    let flow = flow_for(method);
    let position = |s: OrderStatus| flow.iter().position(|f| *f == s);
    let to_pos = position(to).ok_or_else(|| InvariantViolation::StatusNotInFlow {
        order_id: order_id.clone(),
        status: to,
        method,
    })?;
    let from_pos = position(from).ok_or_else(|| InvariantViolation::StatusNotInFlow {
        order_id: order_id.clone(),
        status: from,
        method,
    })?;
    if to_pos < from_pos {
        return Err(InvariantViolation::BackwardTransition { order_id, from, to });
    }
    if effects.require_slot && !order.pickup_scheduled() {
        return Err(InvariantViolation::PickupNotScheduled(order_id));
    }
    Ok(effects)
}

/// Admins may act on any order. Vendors may only act on their own.
pub fn authorize(order: &VendorOrder, operator: &Operator) -> Result<(), InvariantViolation> {
    match operator {
        Operator::Admin(_) => Ok(()),
        Operator::Vendor(id) if *id == order.vendor_id => Ok(()),
        Operator::Vendor(_) => Err(InvariantViolation::NotOrderOwner {
            order_id: order.order_id.clone(),
            operator: operator.to_string(),
            vendor_id: order.vendor_id.clone(),
        }),
    }
}
