use chrono::{DateTime, Days, TimeZone, Utc};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use storefront_common::{BasisPoints, Naira};

use super::prepare_env::{prepare_test_env, random_db_path};
use crate::{
    config::EngineConfig,
    db_types::{BuyerContact, CartLine, DeliveryMethod, PaymentConfirmation, Product, ProductVariant},
    order_objects::CheckoutRequest,
    traits::{ActorManagement, CatalogManagement},
    SqliteDatabase,
};

/// A freshly migrated database in its own file.
pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let config = EngineConfig { database_url: url, ..EngineConfig::default() };
    SqliteDatabase::from_config(&config).await.expect("Error creating connection to database")
}

/// Closes the pool and deletes the database file.
pub async fn tear_down(db: SqliteDatabase) {
    db.pool().close().await;
    if let Err(e) = Sqlite::drop_database(db.url()).await {
        error!("🚀️ Failed to remove test database {}: {e}", db.url());
    }
}

pub async fn seed_vendor(db: &SqliteDatabase, id: &str) {
    db.register_vendor(id, &format!("Vendor {id}")).await.expect("Error registering vendor");
}

pub async fn seed_affiliate(db: &SqliteDatabase, id: &str, percent: i64) {
    db.register_affiliate(id, &format!("Affiliate {id}"), BasisPoints::from_percent(percent))
        .await
        .expect("Error registering affiliate");
}

pub async fn seed_product(db: &SqliteDatabase, id: &str, vendor_id: &str, price_naira: i64, stock: i64) {
    let product = Product {
        id: id.to_string(),
        vendor_id: vendor_id.to_string(),
        name: format!("Product {id}"),
        price: Naira::from_naira(price_naira),
        stock_quantity: stock,
    };
    db.upsert_product(product).await.expect("Error storing product");
}

pub async fn seed_variant(db: &SqliteDatabase, id: &str, product_id: &str, stock: i64) {
    let variant = ProductVariant {
        id: id.to_string(),
        product_id: product_id.to_string(),
        name: format!("Variant {id}"),
        stock_quantity: stock,
    };
    db.upsert_variant(variant).await.expect("Error storing variant");
}

pub fn line(product_id: &str, price_naira: i64, quantity: i64, vendor_id: &str) -> CartLine {
    let vendor_name = format!("Vendor {vendor_id}");
    CartLine::new(product_id, Naira::from_naira(price_naira), quantity, vendor_id, vendor_name.as_str())
}

pub fn buyer() -> BuyerContact {
    BuyerContact::new("Ada Obi", "ada@example.com").with_phone("+2348000000000")
}

/// A checkout paid with exactly `paid_naira`, to which lines still need to be added.
pub fn checkout(method: DeliveryMethod, paid_naira: i64) -> CheckoutRequest {
    let payment = PaymentConfirmation::new(format!("PAY-{:08x}", rand::random::<u32>()), Naira::from_naira(paid_naira));
    CheckoutRequest::new(buyer(), method, payment)
}

/// 10:00 UTC tomorrow. Inside the default pickup window and on its grid.
pub fn tomorrow_at_ten() -> DateTime<Utc> {
    let tomorrow = Utc::now().date_naive().checked_add_days(Days::new(1)).expect("date overflow");
    Utc.from_utc_datetime(&tomorrow.and_hms_opt(10, 0, 0).expect("valid time"))
}
