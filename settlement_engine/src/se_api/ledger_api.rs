use std::fmt::Debug;

use log::*;

use crate::{
    db_types::LedgerActor,
    errors::{NotFoundError, SettlementError},
    order_objects::OrderQueryFilter,
    settlement::ledger::{fold_ledger, LedgerSubject, LedgerView},
    traits::{ActorManagement, OrderManagement, WithdrawalManagement},
};

/// `LedgerApi` derives wallet balances. It never writes; every call replays the actor's full history.
pub struct LedgerApi<B> {
    db: B,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LedgerApi<B>
where B: OrderManagement + WithdrawalManagement + ActorManagement
{
    /// The available and pending balances of `actor`, with the per-order breakdown behind them.
    ///
    /// Completed orders count towards the available balance, orders still in progress towards the pending balance,
    /// and failed orders count for nothing. Every withdrawal that has not been rejected is taken off the available
    /// balance.
    pub async fn compute_ledger(&self, actor: &LedgerActor) -> Result<LedgerView, SettlementError> {
        let subject = resolve_subject(&self.db, actor).await?;
        let orders = self.db.search_orders(OrderQueryFilter::for_actor(actor)).await?;
        let withdrawals = self.db.fetch_withdrawals_for_actor(actor).await?;
        let view = fold_ledger(&subject, &orders, &withdrawals);
        trace!(
            "💰️ Ledger for {actor}: {} available, {} pending over {} orders and {} withdrawals",
            view.available_balance,
            view.pending_balance,
            orders.len(),
            withdrawals.len()
        );
        Ok(view)
    }
}

/// Looks up what a ledger fold needs to know about `actor`. Unknown vendors and affiliates are `NotFound`.
pub(crate) async fn resolve_subject<B: ActorManagement>(
    db: &B,
    actor: &LedgerActor,
) -> Result<LedgerSubject, SettlementError> {
    match actor {
        LedgerActor::Vendor(id) => match db.fetch_vendor(id).await? {
            Some(vendor) => Ok(LedgerSubject::Vendor(vendor.id)),
            None => Err(NotFoundError::Vendor(id.clone()).into()),
        },
        LedgerActor::Affiliate(id) => match db.fetch_affiliate(id).await? {
            Some(affiliate) => Ok(LedgerSubject::Affiliate(affiliate.id)),
            None => Err(NotFoundError::Affiliate(id.clone()).into()),
        },
        LedgerActor::Platform => Ok(LedgerSubject::Platform),
    }
}
