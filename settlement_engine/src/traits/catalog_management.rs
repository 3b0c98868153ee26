use crate::{
    db_types::{Product, ProductVariant},
    errors::SettlementError,
};

/// Just enough of a catalog for checkout to reconcile stock against.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    /// Inserts the product, or replaces the stored product with the same id.
    async fn upsert_product(&self, product: Product) -> Result<Product, SettlementError>;

    /// Inserts the variant, or replaces the stored variant with the same id. The parent product must exist.
    async fn upsert_variant(&self, variant: ProductVariant) -> Result<ProductVariant, SettlementError>;

    async fn fetch_product(&self, product_id: &str) -> Result<Option<Product>, SettlementError>;

    async fn fetch_variant(&self, variant_id: &str) -> Result<Option<ProductVariant>, SettlementError>;
}
