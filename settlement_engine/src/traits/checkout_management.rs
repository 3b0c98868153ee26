use crate::{
    db_types::{NewVendorOrder, SkippedStockLine, StockAdjustment, VendorOrder},
    errors::SettlementError,
};

/// What a stored checkout changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertCheckoutResult {
    pub orders: Vec<VendorOrder>,
    pub adjustments: Vec<StockAdjustment>,
    pub skipped: Vec<SkippedStockLine>,
}

#[allow(async_fn_in_trait)]
pub trait CheckoutManagement: Clone {
    /// Stores every vendor order of a checkout and decrements stock for every line, in a single atomic transaction.
    ///
    /// Stock is decremented on the variant when the line names one, and on the product otherwise. Quantities are
    /// floored at zero, unless `reject_oversell` is set, in which case a line that orders more than is in stock fails
    /// the whole checkout with `ValidationError::InsufficientStock`. Lines whose product or variant does not exist are
    /// reported in [`InsertCheckoutResult::skipped`] and do not fail the checkout.
    ///
    /// An order id that already exists fails the checkout with `ConflictError::DuplicateOrder`.
    async fn insert_checkout(
        &self,
        orders: Vec<NewVendorOrder>,
        reject_oversell: bool,
    ) -> Result<InsertCheckoutResult, SettlementError>;
}
