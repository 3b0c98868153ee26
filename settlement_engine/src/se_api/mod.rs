//! # Settlement engine public API
//!
//! The `se_api` module exposes the programmatic API of the settlement engine. Each API covers one concern, so callers
//! only need a backend that implements the traits that concern requires.
//!
//! * [`checkout_api`] splits a cart into vendor orders and reconciles stock.
//! * [`order_flow_api`] moves orders through their status flow.
//! * [`slot_api`] lists, books, releases and moves pickup slots.
//! * [`ledger_api`] derives wallet balances for vendors, affiliates and the platform.
//! * [`withdrawal_api`] requests and resolves withdrawals against those balances.
//!
//! # API usage
//!
//! Every API is created from a backend and the [`EventProducers`](crate::events::EventProducers) it publishes to:
//!
//! ```rust,ignore
//! use settlement_engine::{events::EventProducers, LedgerApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/storefront.db", 5).await?;
//! let api = LedgerApi::new(db);
//! let view = api.compute_ledger(&LedgerActor::Vendor("v1".into())).await?;
//! println!("Available: {}", view.available_balance);
//! ```

pub mod checkout_api;
pub mod ledger_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod slot_api;
pub mod withdrawal_api;
