use std::fmt::Debug;

use chrono::Utc;
use log::*;
use storefront_common::BasisPoints;

use crate::{
    config::CheckoutPolicy,
    db_types::CheckoutId,
    errors::{NotFoundError, SettlementError},
    events::{CatalogChangedEvent, EventProducers, OrderCreatedEvent},
    order_objects::{CheckoutRequest, CheckoutResult},
    settlement::splitter::split_checkout,
    traits::{ActorManagement, CheckoutManagement},
};

/// `CheckoutApi` turns a paid cart into vendor orders and applies the resulting stock changes.
pub struct CheckoutApi<B> {
    db: B,
    producers: EventProducers,
    policy: CheckoutPolicy,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?})", self.policy)
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, producers: EventProducers, policy: CheckoutPolicy) -> Self {
        Self { db, producers, policy }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }
}

impl<B> CheckoutApi<B>
where B: CheckoutManagement + ActorManagement
{
    /// Splits the cart into one order per vendor, stores the orders and decrements stock, all in one transaction.
    ///
    /// Nothing is stored if the request is invalid, if the affiliate is unknown, or (with `reject_oversell`) if any
    /// line orders more than is in stock. Lines for products missing from the catalog do not fail the checkout; they
    /// are listed in [`CheckoutResult::skipped`].
    ///
    /// Once the transaction commits, an `OrderCreatedEvent` is published for every order, followed by a single
    /// `CatalogChangedEvent`.
    pub async fn split_and_create_order(&self, request: CheckoutRequest) -> Result<CheckoutResult, SettlementError> {
        let affiliate_rate = match &request.affiliate_id {
            Some(affiliate_id) => match self.db.fetch_affiliate(affiliate_id).await? {
                Some(affiliate) => affiliate.commission_rate,
                None => {
                    debug!("🧾️ Checkout refers to unknown affiliate {affiliate_id}");
                    return Err(NotFoundError::Affiliate(affiliate_id.clone()).into());
                },
            },
            None => BasisPoints::default(),
        };
        let checkout_id = CheckoutId::random();
        let new_orders = split_checkout(&checkout_id, &request, &self.policy, affiliate_rate, Utc::now())?;
        trace!("🧾️ Checkout {checkout_id} split into {} vendor orders", new_orders.len());
        let stored = self.db.insert_checkout(new_orders, self.policy.reject_oversell).await?;
        for skipped in &stored.skipped {
            warn!(
                "🧾️ Product {} (variant {:?}) in order {} is not in the catalog. Its stock was not adjusted.",
                skipped.product_id, skipped.variant_id, skipped.order_id
            );
        }
        let result = CheckoutResult {
            checkout_id,
            orders: stored.orders,
            adjustments: stored.adjustments,
            skipped: stored.skipped,
        };
        self.call_checkout_hooks(&result).await;
        info!(
            "🧾️ Checkout {} stored: {} vendor orders totalling {}, {} paid",
            result.checkout_id,
            result.orders.len(),
            result.total(),
            result.amount_paid()
        );
        Ok(result)
    }

    async fn call_checkout_hooks(&self, result: &CheckoutResult) {
        for order in &result.orders {
            self.producers.publish_order_created(OrderCreatedEvent::new(order.clone())).await;
        }
        let event = CatalogChangedEvent {
            checkout_id: result.checkout_id.clone(),
            adjustments: result.adjustments.clone(),
            skipped: result.skipped.clone(),
        };
        self.producers.publish_catalog_changed(event).await;
    }
}
