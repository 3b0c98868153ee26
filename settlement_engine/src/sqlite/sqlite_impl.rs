//! `SqliteDatabase` is the SQLite backend of the settlement engine.
//!
//! It implements every trait defined in the [`crate::traits`] module. Multi-step operations run inside a transaction
//! that writes before it reads, so SQLite's single-writer lock orders competing requests.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{Sqlite, SqlitePool, Transaction};
use storefront_common::BasisPoints;

use super::db::{actors, catalog, new_pool, orders, slots, withdrawals};
use crate::{
    config::EngineConfig,
    db_types::{
        Affiliate,
        CheckoutId,
        DeliveryMethod,
        LedgerActor,
        NewVendorOrder,
        NewWithdrawal,
        OrderId,
        OrderStatus,
        Product,
        ProductVariant,
        TimeSlot,
        Vendor,
        VendorOrder,
        Withdrawal,
        WithdrawalDecision,
    },
    errors::{ConflictError, InvariantViolation, NotFoundError, SettlementError},
    order_objects::OrderQueryFilter,
    settlement::{
        ledger::{fold_ledger, LedgerSubject},
        status_machine::TransitionEffects,
    },
    sqlite::db::catalog::StockOutcome,
    traits::{
        ActorManagement,
        CatalogManagement,
        CheckoutManagement,
        InsertCheckoutResult,
        OrderManagement,
        SlotManagement,
        StatusUpdateResult,
        WithdrawalManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl CheckoutManagement for SqliteDatabase {
    async fn insert_checkout(
        &self,
        new_orders: Vec<NewVendorOrder>,
        reject_oversell: bool,
    ) -> Result<InsertCheckoutResult, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let mut result = InsertCheckoutResult::default();
        for new_order in new_orders {
            let order = orders::insert_order(new_order, &mut tx).await?;
            for line in &order.items {
                match catalog::decrement_stock(&order.order_id, line, reject_oversell, &mut tx).await? {
                    StockOutcome::Adjusted(adjustment) => result.adjustments.push(adjustment),
                    StockOutcome::Skipped(skipped) => result.skipped.push(skipped),
                }
            }
            result.orders.push(order);
        }
        tx.commit().await?;
        debug!(
            "🗃️ Checkout stored: {} orders, {} stock adjustments, {} lines skipped",
            result.orders.len(),
            result.adjustments.len(),
            result.skipped.len()
        );
        Ok(result)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<VendorOrder>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_checkout(&self, checkout_id: &CheckoutId) -> Result<Vec<VendorOrder>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_checkout(checkout_id, &mut conn).await?;
        Ok(orders)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<VendorOrder>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order: &VendorOrder,
        status: OrderStatus,
        effects: TransitionEffects,
    ) -> Result<StatusUpdateResult, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let updated = match orders::update_status(order, order.status, status, effects, now, &mut tx).await? {
            Some(updated) => updated,
            None => return Err(explain_failed_update(order, &mut tx).await),
        };
        let mut released_slot = None;
        if effects.release_slot {
            released_slot = slots::delete_bookings_for_order(&order.order_id, &mut tx).await?;
            if let Some(released) = &released_slot {
                debug!("🗃️ Pickup slot {} released by {} order {}", released.starts_at, status, order.order_id);
            }
        }
        tx.commit().await?;
        Ok(StatusUpdateResult { order: updated, released_slot })
    }
}

impl SlotManagement for SqliteDatabase {
    async fn fetch_bookings_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TimeSlot>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let bookings = slots::fetch_bookings_between(from, to, &mut conn).await?;
        Ok(bookings)
    }

    async fn fetch_booking(&self, slot: DateTime<Utc>) -> Result<Option<TimeSlot>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let booking = slots::fetch_booking(slot, &mut conn).await?;
        Ok(booking)
    }

    async fn book_slot(&self, order_id: &OrderId, slot: DateTime<Utc>) -> Result<TimeSlot, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        // Write first. Holding SQLite's write lock keeps everything read below stable until commit.
        if orders::set_pickup_slot(order_id, Some(slot), now, &mut tx).await? == 0 {
            return Err(explain_unbookable(order_id, &mut tx).await);
        }
        if let Some(held) = slots::fetch_booking_for_order(order_id, &mut tx).await? {
            let err = InvariantViolation::OrderAlreadyHasSlot { order_id: order_id.clone(), slot: held.starts_at };
            return Err(err.into());
        }
        if !slots::claim_slot(slot, order_id, now, &mut tx).await? {
            return Err(explain_failed_claim(order_id, slot, &mut tx).await);
        }
        let booking = slots::fetch_booking(slot, &mut tx).await?.ok_or_else(|| {
            error!("🗃️ The booking of {slot} by {order_id} vanished inside its own transaction");
            SettlementError::DatabaseError(format!("Booking of {slot} by {order_id} was not stored"))
        })?;
        tx.commit().await?;
        debug!("🗃️ Pickup slot {slot} booked by {order_id}");
        Ok(booking)
    }

    async fn release_slot(&self, order_id: &OrderId, slot: DateTime<Utc>) -> Result<TimeSlot, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let released = remove_booking(order_id, slot, &mut tx).await?;
        orders::set_pickup_slot(order_id, None, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Pickup slot {slot} released by {order_id}");
        Ok(released)
    }

    async fn rebook_slot(
        &self,
        order_id: &OrderId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<(TimeSlot, TimeSlot), SettlementError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let released = remove_booking(order_id, from, &mut tx).await?;
        if orders::set_pickup_slot(order_id, Some(to), now, &mut tx).await? == 0 {
            return Err(explain_unbookable(order_id, &mut tx).await);
        }
        if !slots::claim_slot(to, order_id, now, &mut tx).await? {
            // Dropping the transaction rolls back the release of `from`
            return Err(explain_failed_claim(order_id, to, &mut tx).await);
        }
        let booking = slots::fetch_booking(to, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::DatabaseError(format!("Booking of {to} by {order_id} was not stored")))?;
        tx.commit().await?;
        debug!("🗃️ Order {order_id} moved its pickup from {from} to {to}");
        Ok((released, booking))
    }
}

/// Works out why a live pickup order could not be found for `order_id`.
async fn explain_unbookable(order_id: &OrderId, tx: &mut Transaction<'_, Sqlite>) -> SettlementError {
    let order = match orders::fetch_order(order_id, &mut **tx).await {
        Ok(Some(order)) => order,
        Ok(None) => return NotFoundError::Order(order_id.clone()).into(),
        Err(e) => return e.into(),
    };
    if order.delivery_method() != DeliveryMethod::Pickup {
        return InvariantViolation::NotPickupOrder(order.order_id).into();
    }
    if order.status.is_terminal() {
        return InvariantViolation::TerminalOrder { order_id: order.order_id, status: order.status }.into();
    }
    SettlementError::DatabaseError(format!("Order {order_id} is a live pickup order, but could not be updated"))
}

/// Works out why the compare-and-set status update on `order` changed nothing.
async fn explain_failed_update(order: &VendorOrder, tx: &mut Transaction<'_, Sqlite>) -> SettlementError {
    match orders::fetch_order(&order.order_id, &mut **tx).await {
        Ok(Some(current)) if current.status == order.status && !current.pickup_scheduled() => {
            InvariantViolation::PickupNotScheduled(current.order_id).into()
        },
        Ok(Some(_)) => {
            ConflictError::ConcurrentStatusChange { order_id: order.order_id.clone(), expected: order.status }.into()
        },
        Ok(None) => NotFoundError::Order(order.order_id.clone()).into(),
        Err(e) => e.into(),
    }
}

/// Works out why `INSERT OR IGNORE` did not claim `slot` for `order_id`.
async fn explain_failed_claim(
    order_id: &OrderId,
    slot: DateTime<Utc>,
    tx: &mut Transaction<'_, Sqlite>,
) -> SettlementError {
    match slots::fetch_booking(slot, &mut **tx).await {
        Ok(Some(booking)) if booking.order_id != *order_id => {
            ConflictError::SlotTaken { slot, owner: booking.order_id }.into()
        },
        Ok(Some(booking)) => {
            InvariantViolation::OrderAlreadyHasSlot { order_id: order_id.clone(), slot: booking.starts_at }.into()
        },
        Ok(None) => SettlementError::DatabaseError(format!("The claim of {slot} by {order_id} was ignored")),
        Err(e) => e.into(),
    }
}

/// Deletes the booking of `slot` if `order_id` owns it, and explains why not otherwise.
async fn remove_booking(
    order_id: &OrderId,
    slot: DateTime<Utc>,
    tx: &mut Transaction<'_, Sqlite>,
) -> Result<TimeSlot, SettlementError> {
    if let Some(released) = slots::delete_booking(slot, order_id, &mut **tx).await? {
        return Ok(released);
    }
    match slots::fetch_booking(slot, &mut **tx).await? {
        Some(booking) => Err(InvariantViolation::SlotNotOwned {
            slot,
            order_id: order_id.clone(),
            owner: booking.order_id,
        }
        .into()),
        None => Err(NotFoundError::SlotBooking { slot, order_id: order_id.clone() }.into()),
    }
}

impl WithdrawalManagement for SqliteDatabase {
    async fn insert_withdrawal(
        &self,
        withdrawal: NewWithdrawal,
        subject: &LedgerSubject,
    ) -> Result<Withdrawal, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let actor = withdrawal.ledger_actor();
        let requested = withdrawal.amount;
        // Record first, then check. Concurrent requests queue on the write lock and each sees the others' records.
        let record = withdrawals::insert_withdrawal(withdrawal, Utc::now(), &mut tx).await?;
        let history = orders::search_orders(OrderQueryFilter::for_actor(&actor), &mut tx).await?;
        let spent = withdrawals::fetch_withdrawals_for_actor(&actor, &mut tx).await?;
        let view = fold_ledger(subject, &history, &spent);
        if view.available_balance.is_negative() {
            let available = view.available_balance + requested;
            debug!("🗃️ {actor} cannot withdraw {requested}. Only {available} is available. Rolling back.");
            tx.rollback().await?;
            return Err(ConflictError::InsufficientBalance { actor, requested, available }.into());
        }
        tx.commit().await?;
        Ok(record)
    }

    async fn resolve_withdrawal(
        &self,
        id: i64,
        decision: WithdrawalDecision,
        processed_by: &str,
    ) -> Result<Withdrawal, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let resolved = withdrawals::resolve_pending(id, decision, processed_by, Utc::now(), &mut tx).await?;
        let result = match resolved {
            Some(withdrawal) => Ok(withdrawal),
            None => match withdrawals::fetch_withdrawal(id, &mut tx).await? {
                Some(existing) => Err(InvariantViolation::WithdrawalAlreadyResolved { id, status: existing.status }.into()),
                None => Err(NotFoundError::Withdrawal(id).into()),
            },
        };
        tx.commit().await?;
        result
    }

    async fn fetch_withdrawal(&self, id: i64) -> Result<Option<Withdrawal>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawal = withdrawals::fetch_withdrawal(id, &mut conn).await?;
        Ok(withdrawal)
    }

    async fn fetch_withdrawals_for_actor(&self, actor: &LedgerActor) -> Result<Vec<Withdrawal>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let history = withdrawals::fetch_withdrawals_for_actor(actor, &mut conn).await?;
        Ok(history)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn upsert_product(&self, product: Product) -> Result<Product, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let product = catalog::upsert_product(product, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Product {} has {} in stock", product.id, product.stock_quantity);
        Ok(product)
    }

    async fn upsert_variant(&self, variant: ProductVariant) -> Result<ProductVariant, SettlementError> {
        let mut tx = self.pool.begin().await?;
        if catalog::fetch_product(&variant.product_id, &mut tx).await?.is_none() {
            return Err(NotFoundError::Product(variant.product_id).into());
        }
        let variant = catalog::upsert_variant(variant, &mut tx).await?;
        tx.commit().await?;
        Ok(variant)
    }

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_variant(&self, variant_id: &str) -> Result<Option<ProductVariant>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let variant = catalog::fetch_variant(variant_id, &mut conn).await?;
        Ok(variant)
    }
}

impl ActorManagement for SqliteDatabase {
    async fn register_vendor(&self, id: &str, name: &str) -> Result<Vendor, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let vendor = actors::upsert_vendor(id, name, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Vendor {id} registered");
        Ok(vendor)
    }

    async fn register_affiliate(
        &self,
        id: &str,
        name: &str,
        commission_rate: BasisPoints,
    ) -> Result<Affiliate, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let affiliate = actors::upsert_affiliate(id, name, commission_rate, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Affiliate {id} registered at {commission_rate}");
        Ok(affiliate)
    }

    async fn fetch_vendor(&self, id: &str) -> Result<Option<Vendor>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let vendor = actors::fetch_vendor(id, &mut conn).await?;
        Ok(vendor)
    }

    async fn fetch_affiliate(&self, id: &str) -> Result<Option<Affiliate>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let affiliate = actors::fetch_affiliate(id, &mut conn).await?;
        Ok(affiliate)
    }
}

impl SqliteDatabase {
    /// Connects to the database named in `config`. The schema must already be migrated.
    pub async fn from_config(config: &EngineConfig) -> Result<Self, sqlx::Error> {
        info!("🗃️ Using database URL: {}", config.database_url);
        SqliteDatabase::new_with_url(&config.database_url, config.max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
