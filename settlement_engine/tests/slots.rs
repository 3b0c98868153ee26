use std::sync::Arc;

use chrono::{Days, Duration, Utc};
use futures_util::future::join_all;
use log::*;
use settlement_engine::{
    config::CheckoutPolicy,
    db_types::{DeliveryMethod, Operator, OrderId, OrderStatus},
    errors::{ConflictError, InvariantViolation, NotFoundError, ValidationError},
    events::EventProducers,
    settlement::slot_calendar::SlotCalendar,
    test_utils::fixtures::*,
    CheckoutApi,
    OrderFlowApi,
    SettlementError,
    SlotApi,
    SlotManagement,
    SqliteDatabase,
};

async fn setup() -> SlotApi<SqliteDatabase> {
    let db = new_test_db().await;
    SlotApi::new(db, EventProducers::default(), SlotCalendar::default())
}

/// Creates one pickup order for each of `count` vendors, from a single checkout.
async fn pickup_orders(db: &SqliteDatabase, count: usize) -> Vec<OrderId> {
    let api = CheckoutApi::new(db.clone(), EventProducers::default(), CheckoutPolicy::default());
    #[allow(clippy::cast_possible_wrap)]
    let mut request = checkout(DeliveryMethod::Pickup, 100 * count as i64);
    for i in 0..count {
        request = request.with_line(line(&format!("p{i}"), 1_000, 1, &format!("V{i}")));
    }
    let result = api.split_and_create_order(request).await.expect("Error creating pickup orders");
    result.orders.into_iter().map(|o| o.order_id).collect()
}

#[tokio::test]
async fn a_slot_has_one_owner_until_released() {
    let api = setup().await;
    let orders = pickup_orders(api.db(), 2).await;
    let slot = tomorrow_at_ten();

    let booking = api.book_slot(&orders[0], slot).await.expect("first booking succeeds");
    assert_eq!(booking.starts_at, slot);
    assert_eq!(booking.order_id, orders[0]);

    let err = api.book_slot(&orders[1], slot).await.expect_err("slot is taken");
    assert!(matches!(err, SettlementError::Conflict(ConflictError::SlotTaken { ref owner, .. }) if *owner == orders[0]));

    let err = api.release_slot(&orders[1], slot).await.expect_err("only the owner may release");
    assert!(matches!(err, SettlementError::InvariantViolation(InvariantViolation::SlotNotOwned { .. })));

    api.release_slot(&orders[0], slot).await.expect("owner releases");
    let err = api.release_slot(&orders[0], slot).await.expect_err("nothing left to release");
    assert!(matches!(err, SettlementError::NotFound(NotFoundError::SlotBooking { .. })));

    api.book_slot(&orders[1], slot).await.expect("slot is free again");
    let owner = api.db().fetch_booking(slot).await.unwrap().expect("booking exists");
    assert_eq!(owner.order_id, orders[1]);
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn booked_slots_are_not_available() {
    let api = setup().await;
    let orders = pickup_orders(api.db(), 1).await;
    let slot = tomorrow_at_ten();
    let date = slot.date_naive();
    let before = api.available_slots(date, Utc::now()).await.unwrap();
    // 09:00 to 21:00 in 10 minute steps
    assert_eq!(before.len(), 72);
    assert!(before.iter().all(|s| s.available));

    api.book_slot(&orders[0], slot).await.unwrap();
    let after = api.available_slots(date, Utc::now()).await.unwrap();
    let taken = after.iter().filter(|s| !s.available).collect::<Vec<_>>();
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0].starts_at, slot);

    let yesterday = Utc::now().date_naive().checked_sub_days(Days::new(1)).unwrap();
    assert!(api.available_slots(yesterday, Utc::now()).await.unwrap().is_empty());
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn slots_must_be_on_the_calendar() {
    let api = setup().await;
    let orders = pickup_orders(api.db(), 1).await;
    let slot = tomorrow_at_ten();

    let err = api.book_slot(&orders[0], slot + Duration::minutes(5)).await.unwrap_err();
    assert!(matches!(err, SettlementError::Validation(ValidationError::SlotOffGrid { granularity: 10, .. })));
    let err = api.book_slot(&orders[0], slot + Duration::hours(12)).await.unwrap_err();
    assert!(matches!(err, SettlementError::Validation(ValidationError::SlotOutsideWindow(_))));
    let err = api.book_slot(&orders[0], slot - Duration::days(2)).await.unwrap_err();
    assert!(matches!(err, SettlementError::Validation(ValidationError::SlotInPast(_))));
    assert!(api.db().fetch_bookings_between(slot - Duration::days(3), slot + Duration::days(1)).await.unwrap().is_empty());
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn only_live_pickup_orders_can_book() {
    let api = setup().await;
    let orders = pickup_orders(api.db(), 1).await;
    let slot = tomorrow_at_ten();

    let err = api.book_slot(&OrderId::from("nope"), slot).await.unwrap_err();
    assert!(matches!(err, SettlementError::NotFound(NotFoundError::Order(_))));

    let delivery = CheckoutApi::new(api.db().clone(), EventProducers::default(), CheckoutPolicy::default());
    let result = delivery
        .split_and_create_order(checkout(DeliveryMethod::Delivery, 500).with_line(line("p9", 500, 1, "V9")))
        .await
        .unwrap();
    let err = api.book_slot(&result.orders[0].order_id, slot).await.unwrap_err();
    assert!(matches!(err, SettlementError::InvariantViolation(InvariantViolation::NotPickupOrder(_))));

    api.book_slot(&orders[0], slot).await.unwrap();
    let err = api.book_slot(&orders[0], slot + Duration::minutes(10)).await.unwrap_err();
    assert!(matches!(err, SettlementError::InvariantViolation(InvariantViolation::OrderAlreadyHasSlot { .. })));
    let held = api.db().fetch_bookings_between(slot, slot + Duration::hours(1)).await.unwrap();
    assert_eq!(held.len(), 1);
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn rebooking_is_atomic() {
    let api = setup().await;
    let orders = pickup_orders(api.db(), 2).await;
    let ten = tomorrow_at_ten();
    let ten_past = ten + Duration::minutes(10);
    let twenty_past = ten + Duration::minutes(20);
    api.book_slot(&orders[0], ten).await.unwrap();
    api.book_slot(&orders[1], ten_past).await.unwrap();

    let err = api.rebook_slot(&orders[0], ten, ten_past).await.unwrap_err();
    assert!(matches!(err, SettlementError::Conflict(ConflictError::SlotTaken { .. })));
    let kept = api.db().fetch_booking(ten).await.unwrap().expect("original booking is kept");
    assert_eq!(kept.order_id, orders[0]);

    let moved = api.rebook_slot(&orders[0], ten, twenty_past).await.unwrap();
    assert_eq!(moved.starts_at, twenty_past);
    assert!(api.db().fetch_booking(ten).await.unwrap().is_none());
    tear_down(api.db().clone()).await;
}

#[tokio::test]
async fn terminal_orders_give_their_slot_back() {
    let api = setup().await;
    let orders = pickup_orders(api.db(), 2).await;
    let slot = tomorrow_at_ten();
    api.book_slot(&orders[0], slot).await.unwrap();

    let flow = OrderFlowApi::new(api.db().clone(), EventProducers::default());
    let admin = Operator::Admin("root".into());
    flow.transition_order_status(&orders[0], OrderStatus::Cancelled, &admin).await.unwrap();
    assert!(api.db().fetch_booking(slot).await.unwrap().is_none());
    api.book_slot(&orders[1], slot).await.expect("the cancelled order's slot is free");

    let err = api.book_slot(&orders[0], slot + Duration::minutes(30)).await.unwrap_err();
    assert!(matches!(err, SettlementError::InvariantViolation(InvariantViolation::TerminalOrder { .. })));
    tear_down(api.db().clone()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookers_get_one_winner() {
    const BOOKERS: usize = 12;
    let api = Arc::new(setup().await);
    let orders = pickup_orders(api.db(), BOOKERS).await;
    let slot = tomorrow_at_ten();

    let attempts = orders.into_iter().map(|order_id| {
        let api = Arc::clone(&api);
        tokio::spawn(async move { api.book_slot(&order_id, slot).await })
    });
    let results = join_all(attempts).await.into_iter().map(|r| r.expect("task panicked")).collect::<Vec<_>>();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let losers = results
        .iter()
        .filter(|r| matches!(r, Err(SettlementError::Conflict(ConflictError::SlotTaken { .. }))))
        .count();
    info!("🚀️ {winners} winner and {losers} conflicts from {BOOKERS} bookers");
    assert_eq!(winners, 1);
    assert_eq!(losers, BOOKERS - 1);
    let bookings = api.db().fetch_bookings_between(slot, slot + Duration::minutes(10)).await.unwrap();
    assert_eq!(bookings.len(), 1);
    tear_down(api.db().clone()).await;
}
