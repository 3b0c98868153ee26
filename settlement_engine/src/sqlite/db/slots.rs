use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use super::decode_err;
use crate::{
    db_types::{OrderId, TimeSlot},
    settlement::slot_calendar::{parse_slot_key, slot_key},
};

impl FromRow<'_, SqliteRow> for TimeSlot {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let key: String = row.try_get("slot_time")?;
        Ok(Self {
            starts_at: parse_slot_key(&key).map_err(|e| decode_err("slot_time", e))?,
            order_id: OrderId(row.try_get("order_id")?),
            booked_at: row.try_get("booked_at")?,
        })
    }
}

/// Claims `slot` for `order_id` with a single `INSERT OR IGNORE`. Returns `false` if nothing was inserted, either
/// because the slot already has an owner, or because the order already owns a slot.
pub async fn claim_slot(
    slot: DateTime<Utc>,
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let key = slot_key(&slot);
    let result = sqlx::query("INSERT OR IGNORE INTO time_slots (slot_time, order_id, booked_at) VALUES ($1, $2, $3)")
        .bind(&key)
        .bind(order_id.as_str())
        .bind(now)
        .execute(conn)
        .await?;
    trace!("🗃️ Claim on {key} by {order_id}: {} rows inserted", result.rows_affected());
    Ok(result.rows_affected() == 1)
}

pub async fn fetch_booking(slot: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Option<TimeSlot>, sqlx::Error> {
    let booking = sqlx::query_as("SELECT * FROM time_slots WHERE slot_time = $1")
        .bind(slot_key(&slot))
        .fetch_optional(conn)
        .await?;
    Ok(booking)
}

pub async fn fetch_booking_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<TimeSlot>, sqlx::Error> {
    let booking = sqlx::query_as("SELECT * FROM time_slots WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(booking)
}

/// Bookings starting in `[from, to)`, earliest first. Slot keys sort chronologically as text.
pub async fn fetch_bookings_between(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<TimeSlot>, sqlx::Error> {
    let bookings =
        sqlx::query_as("SELECT * FROM time_slots WHERE slot_time >= $1 AND slot_time < $2 ORDER BY slot_time ASC")
            .bind(slot_key(&from))
            .bind(slot_key(&to))
            .fetch_all(conn)
            .await?;
    Ok(bookings)
}

/// Deletes the booking of `slot`, but only if `order_id` owns it.
pub async fn delete_booking(
    slot: DateTime<Utc>,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<TimeSlot>, sqlx::Error> {
    let deleted: Vec<TimeSlot> = sqlx::query_as("DELETE FROM time_slots WHERE slot_time = $1 AND order_id = $2 RETURNING *")
        .bind(slot_key(&slot))
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(deleted.into_iter().next())
}

/// Deletes whatever booking `order_id` holds, if any.
pub async fn delete_bookings_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<TimeSlot>, sqlx::Error> {
    let deleted: Vec<TimeSlot> = sqlx::query_as("DELETE FROM time_slots WHERE order_id = $1 RETURNING *")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(deleted.into_iter().next())
}
