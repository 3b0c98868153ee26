use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_common::Naira;

use crate::db_types::{
    BuyerContact,
    CartLine,
    CheckoutId,
    DeliveryMethod,
    LedgerActor,
    OrderStatus,
    PaymentConfirmation,
    SkippedStockLine,
    StockAdjustment,
    VendorOrder,
};

/// Everything the storefront hands over at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub lines: Vec<CartLine>,
    pub delivery_method: DeliveryMethod,
    /// The fee for the whole checkout. It must be zero for pickup checkouts.
    pub delivery_fee: Naira,
    pub payment: PaymentConfirmation,
    pub affiliate_id: Option<String>,
    pub buyer: BuyerContact,
}

impl CheckoutRequest {
    pub fn new(buyer: BuyerContact, delivery_method: DeliveryMethod, payment: PaymentConfirmation) -> Self {
        Self { lines: Vec::new(), delivery_method, delivery_fee: Naira::zero(), payment, affiliate_id: None, buyer }
    }

    pub fn with_line(mut self, line: CartLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn with_delivery_fee(mut self, fee: Naira) -> Self {
        self.delivery_fee = fee;
        self
    }

    pub fn with_affiliate<S: Into<String>>(mut self, affiliate_id: S) -> Self {
        self.affiliate_id = Some(affiliate_id.into());
        self
    }

    /// The sum of every line total. `None` if the cart is too large to represent.
    pub fn cart_subtotal(&self) -> Option<Naira> {
        self.lines.iter().map(CartLine::line_total).try_fold(Naira::zero(), |acc, line| acc.checked_add(line?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutResult {
    pub checkout_id: CheckoutId,
    /// One order per vendor, in order of each vendor's first appearance in the cart
    pub orders: Vec<VendorOrder>,
    pub adjustments: Vec<StockAdjustment>,
    /// Lines whose product or variant was missing from the catalog
    pub skipped: Vec<SkippedStockLine>,
}

impl CheckoutResult {
    pub fn total(&self) -> Naira {
        self.orders.iter().map(|o| o.total).sum()
    }

    pub fn amount_paid(&self) -> Naira {
        self.orders.iter().map(|o| o.amount_paid).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub vendor_id: Option<String>,
    pub affiliate_id: Option<String>,
    pub checkout_id: Option<CheckoutId>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatus>>,
}

impl OrderQueryFilter {
    /// The orders a ledger for `actor` is folded over: a vendor's own orders, the orders attributed to an affiliate,
    /// or every order for the platform.
    pub fn for_actor(actor: &LedgerActor) -> Self {
        match actor {
            LedgerActor::Vendor(id) => Self::default().with_vendor_id(id.as_str()),
            LedgerActor::Affiliate(id) => Self::default().with_affiliate_id(id.as_str()),
            LedgerActor::Platform => Self::default(),
        }
    }

    pub fn with_vendor_id<S: Into<String>>(mut self, vendor_id: S) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self
    }

    pub fn with_affiliate_id<S: Into<String>>(mut self, affiliate_id: S) -> Self {
        self.affiliate_id = Some(affiliate_id.into());
        self
    }

    pub fn with_checkout_id(mut self, checkout_id: CheckoutId) -> Self {
        self.checkout_id = Some(checkout_id);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.vendor_id.is_none() &&
            self.affiliate_id.is_none() &&
            self.checkout_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.status.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(vendor_id) = &self.vendor_id {
            write!(f, "vendor_id: {vendor_id}. ")?;
        }
        if let Some(affiliate_id) = &self.affiliate_id {
            write!(f, "affiliate_id: {affiliate_id}. ")?;
        }
        if let Some(checkout_id) = &self.checkout_id {
            write!(f, "checkout_id: {checkout_id}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}
