//! #  Backend contracts.
//!
//! This module defines the behaviour a storage backend must expose in order to host the settlement engine. The public
//! APIs in [`crate::se_api`] hold a backend and call through these traits; they never touch a database directly.
//!
//! Backends own atomicity. Each method documented as a single transaction must either apply all of its writes or none
//! of them, and must perform its first write before any read that decides the outcome, so that concurrent callers are
//! serialised by the store rather than racing each other.
//!
//! * [`CheckoutManagement`] stores a split checkout and its stock decrements.
//! * [`OrderManagement`] queries orders and applies status transitions.
//! * [`SlotManagement`] arbitrates pickup slot ownership.
//! * [`WithdrawalManagement`] records and resolves withdrawals against a balance.
//! * [`CatalogManagement`] and [`ActorManagement`] seed the products, vendors and affiliates the core reads.
mod actor_management;
mod catalog_management;
mod checkout_management;
mod order_management;
mod slot_management;
mod withdrawal_management;

pub use actor_management::ActorManagement;
pub use catalog_management::CatalogManagement;
pub use checkout_management::{CheckoutManagement, InsertCheckoutResult};
pub use order_management::{OrderManagement, StatusUpdateResult};
pub use slot_management::SlotManagement;
pub use withdrawal_management::WithdrawalManagement;
