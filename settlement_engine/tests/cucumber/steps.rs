use chrono::{DateTime, Days, NaiveTime, TimeZone, Utc};
use cucumber::{then, when};
use settlement_engine::{
    db_types::{
        DeliveryMethod,
        LedgerActor,
        NewWithdrawal,
        Operator,
        OrderStatus,
        WithdrawalActorType,
        WithdrawalDecision,
        WithdrawalMethod,
    },
    test_utils::fixtures::checkout,
    CatalogManagement,
    ErrorKind,
    SlotManagement,
};
use storefront_common::Naira;

use crate::cucumber::StorefrontWorld;

fn naira(amount: i64) -> Naira {
    Naira::from_naira(amount)
}

fn tomorrow_at(time: &str) -> DateTime<Utc> {
    let time = NaiveTime::parse_from_str(time, "%H:%M").expect("Times are written as HH:MM");
    let tomorrow = Utc::now().date_naive().checked_add_days(Days::new(1)).expect("date overflow");
    Utc.from_utc_datetime(&tomorrow.and_time(time))
}

fn parse_status(status: &str) -> OrderStatus {
    status.parse().unwrap_or_else(|_| panic!("Unknown order status {status}"))
}

async fn place_checkout(world: &mut StorefrontWorld, method: DeliveryMethod, fee: i64, paid: i64) {
    let mut request = checkout(method, paid).with_delivery_fee(naira(fee));
    request.lines = std::mem::take(&mut world.cart);
    request.affiliate_id = world.affiliate.take();
    let result = world.system().checkout.split_and_create_order(request).await;
    if let Some(result) = world.record(result) {
        world.orders = result.orders.into_iter().map(|o| (o.vendor_id.clone(), o.order_id)).collect();
    }
}

#[when(expr = "the buyer checks out for delivery with a {int} NGN fee, paying {int} NGN")]
async fn checkout_for_delivery(world: &mut StorefrontWorld, fee: i64, paid: i64) {
    place_checkout(world, DeliveryMethod::Delivery, fee, paid).await;
}

#[when(expr = "the buyer checks out for pickup, paying {int} NGN")]
async fn checkout_for_pickup(world: &mut StorefrontWorld, paid: i64) {
    place_checkout(world, DeliveryMethod::Pickup, 0, paid).await;
}

#[when(expr = "the admin moves the order for vendor {word} to {word}")]
async fn admin_moves_order(world: &mut StorefrontWorld, vendor_id: String, status: String) {
    let order_id = world.order_for(&vendor_id);
    let admin = Operator::Admin("ops".into());
    let result = world.system().flow.transition_order_status(&order_id, parse_status(&status), &admin).await;
    world.record(result);
}

#[when(expr = "vendor {word} moves the order for vendor {word} to {word}")]
async fn vendor_moves_order(world: &mut StorefrontWorld, actor: String, vendor_id: String, status: String) {
    let order_id = world.order_for(&vendor_id);
    let operator = Operator::Vendor(actor);
    let result = world.system().flow.transition_order_status(&order_id, parse_status(&status), &operator).await;
    world.record(result);
}

#[when(expr = "the order for vendor {word} books the pickup slot tomorrow at {word}")]
async fn book_slot(world: &mut StorefrontWorld, vendor_id: String, time: String) {
    let order_id = world.order_for(&vendor_id);
    let result = world.system().slots.book_slot(&order_id, tomorrow_at(&time)).await;
    world.record(result);
}

#[when(expr = "the order for vendor {word} releases the pickup slot tomorrow at {word}")]
async fn release_slot(world: &mut StorefrontWorld, vendor_id: String, time: String) {
    let order_id = world.order_for(&vendor_id);
    let result = world.system().slots.release_slot(&order_id, tomorrow_at(&time)).await;
    world.record(result);
}

#[when(expr = "the order for vendor {word} moves its pickup from {word} to {word} tomorrow")]
async fn rebook_slot(world: &mut StorefrontWorld, vendor_id: String, from: String, to: String) {
    let order_id = world.order_for(&vendor_id);
    let result = world.system().slots.rebook_slot(&order_id, tomorrow_at(&from), tomorrow_at(&to)).await;
    world.record(result);
}

async fn request_withdrawal(world: &mut StorefrontWorld, actor_type: WithdrawalActorType, actor_id: String, amount: i64) {
    let request =
        NewWithdrawal::new(actor_type, actor_id.as_str(), naira(amount), WithdrawalMethod::BankTransfer, "Zenith 2087654321");
    let result = world.system().withdrawals.request_withdrawal(request).await;
    if let Some(withdrawal) = world.record(result) {
        world.last_withdrawal = Some(withdrawal);
    }
}

#[when(expr = "vendor {word} requests a withdrawal of {int} NGN")]
async fn vendor_withdrawal(world: &mut StorefrontWorld, vendor_id: String, amount: i64) {
    request_withdrawal(world, WithdrawalActorType::Vendor, vendor_id, amount).await;
}

#[when(expr = "affiliate {word} requests a withdrawal of {int} NGN")]
async fn affiliate_withdrawal(world: &mut StorefrontWorld, affiliate_id: String, amount: i64) {
    request_withdrawal(world, WithdrawalActorType::Affiliate, affiliate_id, amount).await;
}

async fn resolve_last_withdrawal(world: &mut StorefrontWorld, decision: WithdrawalDecision) {
    let id = world.last_withdrawal.as_ref().expect("No withdrawal has been requested").id;
    let result = world.system().withdrawals.resolve_withdrawal(id, decision, "ops").await;
    if let Some(withdrawal) = world.record(result) {
        world.last_withdrawal = Some(withdrawal);
    }
}

#[when("the admin approves the last withdrawal")]
async fn approve_withdrawal(world: &mut StorefrontWorld) {
    resolve_last_withdrawal(world, WithdrawalDecision::Approve).await;
}

#[when(expr = "the admin rejects the last withdrawal because {string}")]
async fn reject_withdrawal(world: &mut StorefrontWorld, reason: String) {
    resolve_last_withdrawal(world, WithdrawalDecision::Reject { reason }).await;
}

#[then("the request succeeds")]
async fn request_succeeds(world: &mut StorefrontWorld) {
    if let Some(e) = &world.last_error {
        panic!("The last request failed: {e}");
    }
}

#[then(expr = "the request is refused as {word}")]
async fn request_refused(world: &mut StorefrontWorld, kind: String) {
    let expected = match kind.as_str() {
        "validation" => ErrorKind::Validation,
        "conflict" => ErrorKind::Conflict,
        "not-found" => ErrorKind::NotFound,
        "invariant-violation" => ErrorKind::InvariantViolation,
        k => panic!("Unknown error kind {k}"),
    };
    let err = world.last_error.as_ref().expect("The last request succeeded");
    assert_eq!(err.kind(), expected, "Unexpected error: {err}");
}

#[then(expr = "the checkout creates {int} vendor orders")]
async fn checkout_order_count(world: &mut StorefrontWorld, count: usize) {
    assert_eq!(world.orders.len(), count);
}

#[then(expr = "the order for vendor {word} has a delivery fee share of {int} NGN and a total of {int} NGN")]
async fn order_totals(world: &mut StorefrontWorld, vendor_id: String, share: i64, total: i64) {
    let order = world.system().flow.fetch_order(&world.order_for(&vendor_id)).await.expect("Error fetching order");
    assert_eq!(order.delivery_fee_share, naira(share));
    assert_eq!(order.total, naira(total));
}

#[then(expr = "the order for vendor {word} carries an admin commission of {int} NGN and a net amount of {int} NGN")]
async fn order_commission(world: &mut StorefrontWorld, vendor_id: String, commission: i64, net: i64) {
    let order = world.system().flow.fetch_order(&world.order_for(&vendor_id)).await.expect("Error fetching order");
    assert_eq!(order.admin_commission, naira(commission));
    assert_eq!(order.vendor_net_amount, naira(net));
}

#[then(expr = "the order for vendor {word} has paid {int} NGN with {int} NGN due")]
async fn order_payment(world: &mut StorefrontWorld, vendor_id: String, paid: i64, due: i64) {
    let order = world.system().flow.fetch_order(&world.order_for(&vendor_id)).await.expect("Error fetching order");
    assert_eq!(order.amount_paid, naira(paid));
    assert_eq!(order.balance_due, naira(due));
}

#[then(expr = "the order for vendor {word} is {word}")]
async fn order_status(world: &mut StorefrontWorld, vendor_id: String, status: String) {
    let order = world.system().flow.fetch_order(&world.order_for(&vendor_id)).await.expect("Error fetching order");
    assert_eq!(order.status, parse_status(&status));
}

#[then(expr = "product {word} has {int} in stock")]
async fn product_stock(world: &mut StorefrontWorld, product_id: String, stock: i64) {
    let product = world.system().db.fetch_product(&product_id).await.expect("Error fetching product");
    assert_eq!(product.expect("Product does not exist").stock_quantity, stock);
}

#[then(expr = "the pickup slot tomorrow at {word} is available")]
async fn slot_is_free(world: &mut StorefrontWorld, time: String) {
    let slot = tomorrow_at(&time);
    let available = world.system().slots.available_slots(slot.date_naive(), Utc::now()).await.expect("Error listing slots");
    let entry = available.iter().find(|s| s.starts_at == slot).expect("Slot is not on the calendar");
    assert!(entry.available, "Slot {time} is taken");
}

#[then(expr = "the pickup slot tomorrow at {word} is taken by the order for vendor {word}")]
async fn slot_is_taken(world: &mut StorefrontWorld, time: String, vendor_id: String) {
    let booking = world.system().db.fetch_booking(tomorrow_at(&time)).await.expect("Error fetching booking");
    assert_eq!(booking.expect("Slot is free").order_id, world.order_for(&vendor_id));
}

async fn check_ledger(world: &mut StorefrontWorld, actor: LedgerActor, available: i64, pending: i64) {
    let view = world.system().ledger.compute_ledger(&actor).await.expect("Error computing ledger");
    assert_eq!(view.available_balance, naira(available), "Available balance of {actor}");
    assert_eq!(view.pending_balance, naira(pending), "Pending balance of {actor}");
}

#[then(expr = "vendor {word} has {int} NGN available and {int} NGN pending")]
async fn vendor_ledger(world: &mut StorefrontWorld, vendor_id: String, available: i64, pending: i64) {
    check_ledger(world, LedgerActor::Vendor(vendor_id), available, pending).await;
}

#[then(expr = "affiliate {word} has {int} NGN available and {int} NGN pending")]
async fn affiliate_ledger(world: &mut StorefrontWorld, affiliate_id: String, available: i64, pending: i64) {
    check_ledger(world, LedgerActor::Affiliate(affiliate_id), available, pending).await;
}

#[then(expr = "the platform has {int} NGN available and {int} NGN pending")]
async fn platform_ledger(world: &mut StorefrontWorld, available: i64, pending: i64) {
    check_ledger(world, LedgerActor::Platform, available, pending).await;
}

#[then(expr = "the last withdrawal is {word}")]
async fn withdrawal_status(world: &mut StorefrontWorld, status: String) {
    let withdrawal = world.last_withdrawal.as_ref().expect("No withdrawal has been requested");
    assert_eq!(withdrawal.status.to_string(), status);
}
