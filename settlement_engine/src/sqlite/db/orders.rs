use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, SqliteConnection};
use storefront_common::Naira;

use super::decode_err;
use crate::{
    db_types::{CheckoutId, DeliveryMethod, Fulfilment, NewVendorOrder, OrderId, OrderStatus, VendorOrder},
    errors::{ConflictError, SettlementError},
    order_objects::OrderQueryFilter,
    settlement::{
        slot_calendar::{parse_slot_key, slot_key},
        status_machine::TransitionEffects,
    },
};

impl FromRow<'_, SqliteRow> for VendorOrder {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let items: String = row.try_get("items")?;
        let buyer: String = row.try_get("buyer")?;
        let method: String = row.try_get("delivery_method")?;
        let pickup_slot: Option<String> = row.try_get("pickup_slot")?;
        let payment_type: String = row.try_get("payment_type")?;
        let status: String = row.try_get("status")?;
        let fulfilment = match method.parse::<DeliveryMethod>().map_err(|e| decode_err("delivery_method", e))? {
            DeliveryMethod::Delivery => Fulfilment::Delivery,
            DeliveryMethod::Pickup => {
                let slot = pickup_slot
                    .as_deref()
                    .map(parse_slot_key)
                    .transpose()
                    .map_err(|e| decode_err("pickup_slot", e))?;
                Fulfilment::Pickup { slot }
            },
        };
        Ok(Self {
            id: row.try_get("id")?,
            order_id: OrderId(row.try_get("order_id")?),
            checkout_id: CheckoutId(row.try_get("checkout_id")?),
            vendor_id: row.try_get("vendor_id")?,
            vendor_name: row.try_get("vendor_name")?,
            items: serde_json::from_str(&items).map_err(|e| decode_err("items", e))?,
            buyer: serde_json::from_str(&buyer).map_err(|e| decode_err("buyer", e))?,
            subtotal: row.try_get("subtotal")?,
            delivery_fee_share: row.try_get("delivery_fee_share")?,
            total: row.try_get("total")?,
            fulfilment,
            payment_type: payment_type.parse().map_err(|e| decode_err("payment_type", e))?,
            amount_paid: row.try_get("amount_paid")?,
            balance_due: row.try_get("balance_due")?,
            payment_reference: row.try_get("payment_reference")?,
            payment_released: row.try_get("payment_released")?,
            status: status.parse().map_err(|e| decode_err("status", e))?,
            commission_rate: row.try_get("commission_rate")?,
            admin_commission: row.try_get("admin_commission")?,
            vendor_net_amount: row.try_get("vendor_net_amount")?,
            affiliate_id: row.try_get("affiliate_id")?,
            affiliate_commission_rate: row.try_get("affiliate_commission_rate")?,
            affiliate_commission: row.try_get("affiliate_commission")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Inserts a new vendor order. This is not atomic on its own; embed it in a transaction alongside the stock updates
/// for the same checkout.
pub async fn insert_order(order: NewVendorOrder, conn: &mut SqliteConnection) -> Result<VendorOrder, SettlementError> {
    let order_id = order.order_id.clone();
    let items = serde_json::to_string(&order.items).map_err(|e| SettlementError::DatabaseError(e.to_string()))?;
    let buyer = serde_json::to_string(&order.buyer).map_err(|e| SettlementError::DatabaseError(e.to_string()))?;
    let pickup_slot = order.fulfilment.pickup_slot().map(|s| slot_key(&s));
    let inserted: Vec<VendorOrder> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                checkout_id,
                vendor_id,
                vendor_name,
                items,
                buyer,
                subtotal,
                delivery_fee_share,
                total,
                delivery_method,
                pickup_slot,
                payment_type,
                amount_paid,
                balance_due,
                payment_reference,
                commission_rate,
                admin_commission,
                vendor_net_amount,
                affiliate_id,
                affiliate_commission_rate,
                affiliate_commission,
                created_at,
                updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23
            )
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(order.checkout_id.as_str())
    .bind(order.vendor_id)
    .bind(order.vendor_name)
    .bind(items)
    .bind(buyer)
    .bind(order.subtotal)
    .bind(order.delivery_fee_share)
    .bind(order.total)
    .bind(order.fulfilment.method().to_string())
    .bind(pickup_slot)
    .bind(order.payment_type.to_string())
    .bind(order.amount_paid)
    .bind(order.balance_due)
    .bind(order.payment_reference)
    .bind(order.commission_rate)
    .bind(order.admin_commission)
    .bind(order.vendor_net_amount)
    .bind(order.affiliate_id)
    .bind(order.affiliate_commission_rate)
    .bind(order.affiliate_commission)
    .bind(order.created_at)
    .bind(order.created_at)
    .fetch_all(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            SettlementError::from(ConflictError::DuplicateOrder(order_id.clone()))
        },
        _ => SettlementError::from(e),
    })?;
    let order = inserted.into_iter().next().ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Order {} inserted with id {}", order.order_id, order.id);
    Ok(order)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<VendorOrder>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_checkout(
    checkout_id: &CheckoutId,
    conn: &mut SqliteConnection,
) -> Result<Vec<VendorOrder>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE checkout_id = $1 ORDER BY id ASC")
        .bind(checkout_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at`, then by `id`, in ascending order
pub async fn search_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<VendorOrder>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(vendor_id) = query.vendor_id {
        where_clause.push("vendor_id = ");
        where_clause.push_bind_unseparated(vendor_id);
    }
    if let Some(affiliate_id) = query.affiliate_id {
        where_clause.push("affiliate_id = ");
        where_clause.push_bind_unseparated(affiliate_id);
    }
    if let Some(checkout_id) = query.checkout_id {
        where_clause.push("checkout_id = ");
        where_clause.push_bind_unseparated(checkout_id.0);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    if let Some(statuses) = query.status {
        if !statuses.is_empty() {
            let statuses = statuses.into_iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
            where_clause.push(format!("status IN ({statuses})"));
        }
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<VendorOrder>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Compare-and-set status update. Returns `None` if the order's stored status is no longer `expected`, or if
/// `effects.require_slot` is set and the order no longer holds a pickup slot.
///
/// With `effects.settle_payment`, the outstanding balance is collected and the funds are released to the vendor.
pub async fn update_status(
    order: &VendorOrder,
    expected: OrderStatus,
    status: OrderStatus,
    effects: TransitionEffects,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<VendorOrder>, sqlx::Error> {
    let (amount_paid, balance_due, released) = if effects.settle_payment {
        (order.total, Naira::zero(), true)
    } else {
        (order.amount_paid, order.balance_due, order.payment_released)
    };
    let updated: Vec<VendorOrder> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                amount_paid = $2,
                balance_due = $3,
                payment_released = $4,
                updated_at = $5
            WHERE order_id = $6 AND status = $7 AND ($8 = FALSE OR pickup_slot IS NOT NULL)
            RETURNING *;
        "#,
    )
    .bind(status.to_string())
    .bind(amount_paid)
    .bind(balance_due)
    .bind(released)
    .bind(now)
    .bind(order.order_id.as_str())
    .bind(expected.to_string())
    .bind(effects.require_slot)
    .fetch_all(conn)
    .await?;
    Ok(updated.into_iter().next())
}

/// Records `slot` on a live pickup order. Returns the number of rows changed, which is zero if the order does not
/// exist, is not a pickup order, or is terminal.
pub async fn set_pickup_slot(
    order_id: &OrderId,
    slot: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE orders SET pickup_slot = $1, updated_at = $2
            WHERE order_id = $3
              AND delivery_method = 'pickup'
              AND status NOT IN ('completed', 'disputed', 'refunded', 'cancelled');
        "#,
    )
    .bind(slot.map(|s| slot_key(&s)))
    .bind(now)
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
