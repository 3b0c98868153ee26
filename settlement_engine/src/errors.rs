//! Error taxonomy for the settlement engine.
//!
//! Every failure surfaced by the public API is a [`SettlementError`], which sorts the failure into one of four classes
//! (plus database failures) so that callers can decide whether to fix their input, retry with different input, or
//! give up:
//!
//! * [`ValidationError`]: the request itself is malformed. Nothing was changed.
//! * [`ConflictError`]: the request was valid, but lost against the current shared state (a taken slot, funds that
//!   are no longer available). Nothing was changed; retry with different input.
//! * [`NotFoundError`]: a referenced record does not exist.
//! * [`InvariantViolation`]: the request would break a state-machine or ownership rule, and is always refused.
use chrono::{DateTime, SecondsFormat, Utc};
use storefront_common::Naira;
use thiserror::Error;

use crate::db_types::{DeliveryMethod, LedgerActor, OrderId, OrderStatus, WithdrawalStatus};

fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    InvariantViolation,
    Database,
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Validation error. {0}")]
    Validation(#[from] ValidationError),
    #[error("Conflict. {0}")]
    Conflict(#[from] ConflictError),
    #[error("Not found. {0}")]
    NotFound(#[from] NotFoundError),
    #[error("Invariant violation. {0}")]
    InvariantViolation(#[from] InvariantViolation),
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
}

impl SettlementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettlementError::Validation(_) => ErrorKind::Validation,
            SettlementError::Conflict(_) => ErrorKind::Conflict,
            SettlementError::NotFound(_) => ErrorKind::NotFound,
            SettlementError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            SettlementError::DatabaseError(_) => ErrorKind::Database,
        }
    }
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Product {product_id} has quantity {quantity}. Quantities must be at least 1")]
    InvalidQuantity { product_id: String, quantity: i64 },
    #[error("Product {product_id} has a negative unit price ({price})")]
    NegativePrice { product_id: String, price: Naira },
    #[error("The delivery fee cannot be negative ({0})")]
    NegativeDeliveryFee(Naira),
    #[error("Pickup checkouts cannot carry a delivery fee ({0})")]
    DeliveryFeeOnPickup(Naira),
    #[error("The payment confirmation has no reference")]
    MissingPaymentReference,
    #[error("The checkout total is too large to represent in kobo")]
    AmountOverflow,
    #[error("Payment {reference} confirmed {confirmed}, but {expected} is due at checkout")]
    PaymentShortfall { reference: String, expected: Naira, confirmed: Naira },
    #[error("Only {available} of product {product_id} (variant {variant:?}) are in stock, but {requested} were ordered")]
    InsufficientStock { product_id: String, variant: Option<String>, requested: i64, available: i64 },
    #[error("Invalid amount {amount}. Withdrawals must be at least {minimum}")]
    InvalidAmount { amount: Naira, minimum: Naira },
    #[error("Withdrawal account details are required")]
    MissingAccountDetails,
    #[error("A reason is required to reject withdrawal #{0}")]
    MissingRejectionReason(i64),
    #[error("{} is not on the {}-minute slot grid", ts(.slot), .granularity)]
    SlotOffGrid { slot: DateTime<Utc>, granularity: i64 },
    #[error("{} is outside the pickup window", ts(.0))]
    SlotOutsideWindow(DateTime<Utc>),
    #[error("{} is in the past", ts(.0))]
    SlotInPast(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("The pickup slot {} is already booked by order {}", ts(.slot), .owner)]
    SlotTaken { slot: DateTime<Utc>, owner: OrderId },
    #[error("{actor} requested {requested}, but only {available} is available")]
    InsufficientBalance { actor: LedgerActor, requested: Naira, available: Naira },
    #[error("Order {order_id} is no longer {expected}. Another update got there first")]
    ConcurrentStatusChange { order_id: OrderId, expected: OrderStatus },
    #[error("Order {0} already exists")]
    DuplicateOrder(OrderId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("The requested order {0} does not exist")]
    Order(OrderId),
    #[error("There is no booking for order {} at {}", .order_id, ts(.slot))]
    SlotBooking { slot: DateTime<Utc>, order_id: OrderId },
    #[error("Withdrawal #{0} does not exist")]
    Withdrawal(i64),
    #[error("Vendor {0} does not exist")]
    Vendor(String),
    #[error("Affiliate {0} does not exist")]
    Affiliate(String),
    #[error("Product {0} does not exist")]
    Product(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("Order {order_id} cannot move backward from {from} to {to}")]
    BackwardTransition { order_id: OrderId, from: OrderStatus, to: OrderStatus },
    #[error("Order {order_id} is already {status}. The requested change would result in a no-op")]
    NoOpTransition { order_id: OrderId, status: OrderStatus },
    #[error("Order {order_id} is {status}, which is final")]
    TerminalOrder { order_id: OrderId, status: OrderStatus },
    #[error("{status} is not part of the {method} flow (order {order_id})")]
    StatusNotInFlow { order_id: OrderId, status: OrderStatus, method: DeliveryMethod },
    #[error("Pickup order {0} cannot progress before a pickup slot is booked")]
    PickupNotScheduled(OrderId),
    #[error("Order {0} is not a pickup order")]
    NotPickupOrder(OrderId),
    #[error("Order {} cannot release {}, which belongs to order {}", .order_id, ts(.slot), .owner)]
    SlotNotOwned { slot: DateTime<Utc>, order_id: OrderId, owner: OrderId },
    #[error("Order {} already holds the pickup slot {}. Release or rebook it instead", .order_id, ts(.slot))]
    OrderAlreadyHasSlot { order_id: OrderId, slot: DateTime<Utc> },
    #[error("Withdrawal #{id} is already {status}")]
    WithdrawalAlreadyResolved { id: i64, status: WithdrawalStatus },
    #[error("{operator} may not change order {order_id}, which belongs to vendor {vendor_id}")]
    NotOrderOwner { order_id: OrderId, operator: String, vendor_id: String },
}
