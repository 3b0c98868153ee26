use settlement_engine::{
    config::CheckoutPolicy,
    db_types::{DeliveryMethod, OrderStatus, PaymentType},
    errors::{NotFoundError, ValidationError},
    events::EventProducers,
    order_objects::OrderQueryFilter,
    test_utils::fixtures::*,
    CatalogManagement,
    CheckoutApi,
    ErrorKind,
    OrderFlowApi,
    OrderManagement,
    SettlementError,
    SqliteDatabase,
};
use storefront_common::{BasisPoints, Naira};

async fn setup(policy: CheckoutPolicy) -> CheckoutApi<SqliteDatabase> {
    let db = new_test_db().await;
    seed_product(&db, "p-a", "A", 2_000, 5).await;
    seed_product(&db, "p-b", "B", 1_000, 2).await;
    CheckoutApi::new(db, EventProducers::default(), policy)
}

async fn stock_of(db: &SqliteDatabase, product_id: &str) -> i64 {
    db.fetch_product(product_id).await.unwrap().expect("product exists").stock_quantity
}

#[tokio::test]
async fn delivery_checkout_splits_fee_and_commission() {
    let api = setup(CheckoutPolicy::default()).await;
    let request = checkout(DeliveryMethod::Delivery, 6_000)
        .with_line(line("p-a", 2_000, 1, "A"))
        .with_line(line("p-b", 1_000, 3, "B"))
        .with_delivery_fee(Naira::from_naira(1_000));
    let result = api.split_and_create_order(request).await.expect("checkout succeeds");

    assert_eq!(result.orders.len(), 2);
    let a = &result.orders[0];
    let b = &result.orders[1];
    assert_eq!(a.vendor_id, "A");
    assert_eq!(a.delivery_fee_share, Naira::from_naira(400));
    assert_eq!(a.total, Naira::from_naira(2_400));
    assert_eq!(a.admin_commission, Naira::from_naira(60));
    assert_eq!(a.vendor_net_amount, Naira::from_naira(2_340));
    assert_eq!(a.payment_type, PaymentType::Full);
    assert_eq!(a.balance_due, Naira::zero());
    assert_eq!(a.status, OrderStatus::Pending);
    assert_eq!(b.delivery_fee_share, Naira::from_naira(600));
    assert_eq!(b.total, Naira::from_naira(3_600));
    assert_eq!(b.admin_commission, Naira::from_naira(90));
    assert_eq!(result.total(), Naira::from_naira(6_000));
    assert_eq!(a.checkout_id, result.checkout_id);
    assert_eq!(b.checkout_id, result.checkout_id);

    // Stock is floored at zero rather than refusing the sale
    assert_eq!(stock_of(api.db(), "p-a").await, 4);
    assert_eq!(stock_of(api.db(), "p-b").await, 0);
    assert_eq!(result.adjustments.len(), 2);
    assert_eq!(result.adjustments[1].remaining, 0);
    assert!(result.skipped.is_empty());
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn pickup_checkout_takes_a_deposit() {
    let api = setup(CheckoutPolicy::default()).await;
    seed_product(api.db(), "p-big", "A", 10_000, 1).await;
    let request = checkout(DeliveryMethod::Pickup, 1_000).with_line(line("p-big", 10_000, 1, "A"));
    let result = api.split_and_create_order(request).await.expect("checkout succeeds");
    let order = &result.orders[0];
    assert_eq!(order.payment_type, PaymentType::Deposit);
    assert_eq!(order.amount_paid, Naira::from_naira(1_000));
    assert_eq!(order.balance_due, Naira::from_naira(9_000));
    assert_eq!(order.delivery_method(), DeliveryMethod::Pickup);
    assert!(!order.pickup_scheduled());
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn variants_are_decremented_instead_of_products() {
    let api = setup(CheckoutPolicy::default()).await;
    seed_variant(api.db(), "p-a-red", "p-a", 3).await;
    let request = checkout(DeliveryMethod::Delivery, 4_000).with_line(line("p-a", 2_000, 2, "A").with_variant("p-a-red"));
    api.split_and_create_order(request).await.expect("checkout succeeds");
    let variant = api.db().fetch_variant("p-a-red").await.unwrap().unwrap();
    assert_eq!(variant.stock_quantity, 1);
    assert_eq!(stock_of(api.db(), "p-a").await, 5);
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn unknown_products_are_skipped_not_fatal() {
    let api = setup(CheckoutPolicy::default()).await;
    let request = checkout(DeliveryMethod::Delivery, 2_500)
        .with_line(line("p-a", 2_000, 1, "A"))
        .with_line(line("ghost", 500, 1, "A"));
    let result = api.split_and_create_order(request).await.expect("checkout succeeds");
    assert_eq!(result.orders.len(), 1);
    assert_eq!(result.adjustments.len(), 1);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].product_id, "ghost");
    assert_eq!(result.skipped[0].order_id, result.orders[0].order_id);
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn oversell_rolls_back_the_whole_checkout_when_rejected() {
    let policy = CheckoutPolicy { reject_oversell: true, ..CheckoutPolicy::default() };
    let api = setup(policy).await;
    let request = checkout(DeliveryMethod::Delivery, 5_000)
        .with_line(line("p-a", 2_000, 1, "A"))
        .with_line(line("p-b", 1_000, 3, "B"));
    let err = api.split_and_create_order(request).await.expect_err("oversell is refused");
    match err {
        SettlementError::Validation(ValidationError::InsufficientStock { product_id, requested, available, .. }) => {
            assert_eq!(product_id, "p-b");
            assert_eq!(requested, 3);
            assert_eq!(available, 2);
        },
        e => panic!("Unexpected error: {e}"),
    }
    // The earlier line's decrement was rolled back along with everything else
    assert_eq!(stock_of(api.db(), "p-a").await, 5);
    assert_eq!(stock_of(api.db(), "p-b").await, 2);
    let orders = api.db().search_orders(OrderQueryFilter::default()).await.unwrap();
    assert!(orders.is_empty());
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn invalid_checkouts_change_nothing() {
    let api = setup(CheckoutPolicy::default()).await;
    let short = checkout(DeliveryMethod::Delivery, 1_999).with_line(line("p-a", 2_000, 1, "A"));
    let err = api.split_and_create_order(short).await.expect_err("shortfall is refused");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let zero_quantity = checkout(DeliveryMethod::Delivery, 0).with_line(line("p-a", 2_000, 0, "A"));
    let err = api.split_and_create_order(zero_quantity).await.expect_err("quantity must be positive");
    assert!(matches!(err, SettlementError::Validation(ValidationError::InvalidQuantity { .. })));

    let unknown_affiliate = checkout(DeliveryMethod::Delivery, 2_000).with_line(line("p-a", 2_000, 1, "A")).with_affiliate("nobody");
    let err = api.split_and_create_order(unknown_affiliate).await.expect_err("affiliate must exist");
    assert!(matches!(err, SettlementError::NotFound(NotFoundError::Affiliate(id)) if id == "nobody"));

    assert_eq!(stock_of(api.db(), "p-a").await, 5);
    assert!(api.db().search_orders(OrderQueryFilter::default()).await.unwrap().is_empty());
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn affiliated_checkouts_can_be_reconstructed() {
    let api = setup(CheckoutPolicy::default()).await;
    seed_affiliate(api.db(), "aff1", 5).await;
    let request = checkout(DeliveryMethod::Delivery, 5_000)
        .with_line(line("p-b", 1_000, 1, "B"))
        .with_line(line("p-a", 2_000, 1, "A"))
        .with_line(line("p-b", 1_000, 2, "B"))
        .with_affiliate("aff1");
    let result = api.split_and_create_order(request).await.expect("checkout succeeds");
    assert!(result.orders.iter().all(|o| o.affiliate_id.as_deref() == Some("aff1")));
    assert!(result.orders.iter().all(|o| o.commission_rate == BasisPoints::new(250)));
    assert!(result.orders.iter().all(|o| o.affiliate_commission_rate == BasisPoints::from_percent(5)));
    assert_eq!(result.orders[0].affiliate_commission, Naira::from_naira(150));
    assert_eq!(result.orders[1].affiliate_commission, Naira::from_naira(100));

    let flow = OrderFlowApi::new(api.db().clone(), EventProducers::default());
    let orders = flow.orders_for_checkout(&result.checkout_id).await.unwrap();
    let vendors = orders.iter().map(|o| o.vendor_id.as_str()).collect::<Vec<_>>();
    assert_eq!(vendors, vec!["B", "A"]);
    assert_eq!(orders[0].items.len(), 2);
    assert_eq!(orders[0].subtotal, Naira::from_naira(3_000));
    assert_eq!(orders, result.orders);

    let mine = api.db().search_orders(OrderQueryFilter::default().with_affiliate_id("aff1")).await.unwrap();
    assert_eq!(mine.len(), 2);
    tear_down(api.db().clone()).await;
}
