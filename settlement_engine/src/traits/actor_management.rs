use storefront_common::BasisPoints;

use crate::{
    db_types::{Affiliate, Vendor},
    errors::SettlementError,
};

#[allow(async_fn_in_trait)]
pub trait ActorManagement: Clone {
    /// Registers a vendor. Registering an existing id updates the name and keeps the original creation date.
    async fn register_vendor(&self, id: &str, name: &str) -> Result<Vendor, SettlementError>;

    /// Registers an affiliate with its commission rate. Registering an existing id updates the name and rate.
    async fn register_affiliate(
        &self,
        id: &str,
        name: &str,
        commission_rate: BasisPoints,
    ) -> Result<Affiliate, SettlementError>;

    async fn fetch_vendor(&self, id: &str) -> Result<Option<Vendor>, SettlementError>;

    async fn fetch_affiliate(&self, id: &str) -> Result<Option<Affiliate>, SettlementError>;
}
