//! Wallet balances, derived from history.
//!
//! Balances are never stored. A [`LedgerView`] is computed by folding over every order attributable to the actor and
//! every withdrawal the actor has made, so the same history always produces the same balances.
use serde::{Deserialize, Serialize};
use storefront_common::{BasisPoints, Naira};

use crate::db_types::{LedgerActor, OrderId, OrderStatus, VendorOrder, Withdrawal, WithdrawalStatus};

/// An actor whose existence has been checked, ready to have its ledger folded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerSubject {
    Vendor(String),
    Affiliate(String),
    Platform,
}

impl LedgerSubject {
    pub fn actor(&self) -> LedgerActor {
        match self {
            LedgerSubject::Vendor(id) => LedgerActor::Vendor(id.clone()),
            LedgerSubject::Affiliate(id) => LedgerActor::Affiliate(id.clone()),
            LedgerSubject::Platform => LedgerActor::Platform,
        }
    }

    /// What this actor earns from `order`, or `None` if the order is not theirs. Every amount is the one recorded on
    /// the order at checkout.
    pub fn earning(&self, order: &VendorOrder) -> Option<Naira> {
        match self {
            LedgerSubject::Vendor(id) => (order.vendor_id == *id).then_some(order.vendor_net_amount),
            LedgerSubject::Affiliate(id) => {
                (order.affiliate_id.as_deref() == Some(id.as_str())).then_some(order.affiliate_commission)
            },
            LedgerSubject::Platform => Some(order.admin_commission),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// The order is complete and the earning can be withdrawn
    Available,
    /// The order is still in progress
    Pending,
    /// The order was disputed, refunded or cancelled. It earns nothing.
    Void,
}

impl From<OrderStatus> for EntryState {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Completed => EntryState::Available,
            s if s.is_failure() => EntryState::Void,
            _ => EntryState::Pending,
        }
    }
}

/// One order's contribution to a ledger, with the commission breakdown that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub order_total: Naira,
    pub commission_rate: BasisPoints,
    pub admin_commission: Naira,
    pub earning: Naira,
    pub state: EntryState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerView {
    pub actor: LedgerActor,
    /// Earnings from completed orders, less every withdrawal that has not been rejected
    pub available_balance: Naira,
    /// Earnings from orders that are still in progress
    pub pending_balance: Naira,
    /// Earnings from completed orders
    pub total_earned: Naira,
    /// Withdrawals requested but not yet resolved
    pub reserved: Naira,
    /// Withdrawals paid out
    pub withdrawn: Naira,
    pub entries: Vec<LedgerEntry>,
}

pub fn fold_ledger(subject: &LedgerSubject, orders: &[VendorOrder], withdrawals: &[Withdrawal]) -> LedgerView {
    let actor = subject.actor();
    let mut view = LedgerView {
        actor: actor.clone(),
        available_balance: Naira::zero(),
        pending_balance: Naira::zero(),
        total_earned: Naira::zero(),
        reserved: Naira::zero(),
        withdrawn: Naira::zero(),
        entries: Vec::new(),
    };
    for order in orders {
        let Some(earning) = subject.earning(order) else {
            continue;
        };
        let state = EntryState::from(order.status);
        match state {
            EntryState::Available => view.total_earned += earning,
            EntryState::Pending => view.pending_balance += earning,
            EntryState::Void => {},
        }
        view.entries.push(LedgerEntry {
            order_id: order.order_id.clone(),
            status: order.status,
            order_total: order.total,
            commission_rate: order.commission_rate,
            admin_commission: order.admin_commission,
            earning,
            state,
        });
    }
    for withdrawal in withdrawals.iter().filter(|w| w.belongs_to(&actor)) {
        match withdrawal.status {
            WithdrawalStatus::Pending => view.reserved += withdrawal.amount,
            WithdrawalStatus::Completed => view.withdrawn += withdrawal.amount,
            WithdrawalStatus::Rejected => {},
        }
    }
    view.available_balance = view.total_earned - view.reserved - view.withdrawn;
    view
}
