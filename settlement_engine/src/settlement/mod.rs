//! Pure settlement logic.
//!
//! Nothing in this module touches the database or the clock. The backends and the public APIs feed it records and
//! timestamps and act on what it returns, which keeps the money and scheduling rules testable in isolation:
//!
//! * [`splitter`] turns a checkout into one priced order per vendor.
//! * [`status_machine`] decides which status transitions are legal and what side effects they carry.
//! * [`slot_calendar`] generates the bookable pickup grid and validates requested slots against it.
//! * [`ledger`] folds order and withdrawal history into a wallet view for one actor.
pub mod ledger;
pub mod slot_calendar;
pub mod splitter;
pub mod status_machine;
