//! Storefront Settlement Engine
//!
//! The settlement engine is the core of a multi-vendor storefront. It turns a paid cart into one order per vendor,
//! keeps stock in line with those orders, hands out pickup slots, and derives what every vendor, affiliate and the
//! platform itself has earned and may withdraw.
//!
//! The library is divided into these main sections:
//! 1. The pure settlement rules ([`mod@settlement`]): cart splitting, the order status machine, the pickup calendar and
//!    the ledger fold. These hold no state and touch no storage.
//! 2. Backend contracts ([`mod@traits`]) and their SQLite implementation, [`SqliteDatabase`]. You should never need to
//!    access the database directly. The exception is the data types in [`mod@db_types`], which are public.
//! 3. The public API ([`mod@se_api`]): [`CheckoutApi`], [`OrderFlowApi`], [`SlotApi`], [`LedgerApi`] and
//!    [`WithdrawalApi`]. Each one is generic over the backend traits it needs.
//!
//! The engine also publishes events when orders, stock, slots and withdrawals change. Hook into them through
//! [`events::EventHooks`].
pub mod config;
pub mod db_types;
pub mod errors;
pub mod events;
pub mod se_api;
pub mod settlement;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use errors::{ErrorKind, SettlementError};
pub use se_api::{
    checkout_api::CheckoutApi,
    ledger_api::LedgerApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    slot_api::SlotApi,
    withdrawal_api::WithdrawalApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    ActorManagement,
    CatalogManagement,
    CheckoutManagement,
    InsertCheckoutResult,
    OrderManagement,
    SlotManagement,
    StatusUpdateResult,
    WithdrawalManagement,
};
