use cucumber::given;
use settlement_engine::{
    db_types::CartLine,
    test_utils::fixtures::{line, seed_product},
    ActorManagement,
    CatalogManagement,
};
use storefront_common::BasisPoints;

use crate::cucumber::{world::StorefrontSystem, StorefrontWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut StorefrontWorld) {
    let system = StorefrontSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "vendor {word} is registered")]
async fn register_vendor(world: &mut StorefrontWorld, vendor_id: String) {
    world.system().db.register_vendor(&vendor_id, &format!("{vendor_id} Stores")).await.expect("Error registering vendor");
}

#[given(expr = "affiliate {word} is registered at {int}%")]
async fn register_affiliate(world: &mut StorefrontWorld, affiliate_id: String, percent: i64) {
    world
        .system()
        .db
        .register_affiliate(&affiliate_id, "Referrer", BasisPoints::from_percent(percent))
        .await
        .expect("Error registering affiliate");
}

#[given(expr = "product {word} from vendor {word} costs {int} NGN with {int} in stock")]
async fn add_product(world: &mut StorefrontWorld, product_id: String, vendor_id: String, price: i64, stock: i64) {
    seed_product(&world.system().db, &product_id, &vendor_id, price, stock).await;
    let product = world.system().db.fetch_product(&product_id).await.expect("Error fetching product");
    assert!(product.is_some(), "Product {product_id} was not stored");
}

#[given(expr = "the cart holds {int} of {word}")]
async fn add_to_cart(world: &mut StorefrontWorld, quantity: i64, product_id: String) {
    let product = world
        .system()
        .db
        .fetch_product(&product_id)
        .await
        .expect("Error fetching product")
        .unwrap_or_else(|| panic!("Product {product_id} does not exist"));
    let cart_line = line(&product.id, 0, quantity, &product.vendor_id);
    world.cart.push(CartLine { unit_price: product.price, ..cart_line });
}

#[given(expr = "the cart is referred by affiliate {word}")]
async fn refer_cart(world: &mut StorefrontWorld, affiliate_id: String) {
    world.affiliate = Some(affiliate_id);
}
