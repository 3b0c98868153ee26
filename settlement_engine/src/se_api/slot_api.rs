use std::{collections::HashSet, fmt::Debug};

use chrono::{DateTime, NaiveDate, Utc};
use log::*;

use crate::{
    db_types::{OrderId, SlotAvailability, TimeSlot},
    errors::SettlementError,
    events::{EventProducers, SlotChange, SlotChangedEvent},
    settlement::slot_calendar::SlotCalendar,
    traits::SlotManagement,
};

/// `SlotApi` hands out pickup slots. Each slot start time can be owned by at most one order.
pub struct SlotApi<B> {
    db: B,
    producers: EventProducers,
    calendar: SlotCalendar,
}

impl<B> Debug for SlotApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SlotApi ({:?})", self.calendar)
    }
}

impl<B> SlotApi<B> {
    pub fn new(db: B, producers: EventProducers, calendar: SlotCalendar) -> Self {
        Self { db, producers, calendar }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn calendar(&self) -> &SlotCalendar {
        &self.calendar
    }
}

impl<B> SlotApi<B>
where B: SlotManagement
{
    /// The slots of `date` (in the calendar's local time) that are still ahead of `now`, each marked with whether it
    /// is free.
    pub async fn available_slots(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<SlotAvailability>, SettlementError> {
        let candidates = self.calendar.slots_for_date(date, now);
        let (Some(first), Some(last)) = (candidates.first(), candidates.last()) else {
            trace!("🗓️ No pickup slots remain on {date}");
            return Ok(Vec::new());
        };
        let booked = self
            .db
            .fetch_bookings_between(*first, *last + self.calendar.granularity())
            .await?
            .into_iter()
            .map(|b| b.starts_at)
            .collect::<HashSet<DateTime<Utc>>>();
        trace!("🗓️ {} of {} pickup slots on {date} are booked", booked.len(), candidates.len());
        let slots = candidates
            .into_iter()
            .map(|starts_at| SlotAvailability { starts_at, available: !booked.contains(&starts_at) })
            .collect();
        Ok(slots)
    }

    /// Books `slot` for a pickup order. The slot must be on the calendar's grid, inside the daily window and in the
    /// future. Fails with `ConflictError::SlotTaken` if another order got it first.
    pub async fn book_slot(&self, order_id: &OrderId, slot: DateTime<Utc>) -> Result<TimeSlot, SettlementError> {
        self.calendar.validate_slot(slot, Utc::now())?;
        let booking = self.db.book_slot(order_id, slot).await?;
        info!("🗓️ Order {order_id} booked the pickup slot {slot}");
        self.producers
            .publish_slot_changed(SlotChangedEvent::new(order_id.clone(), booking.clone(), SlotChange::Booked))
            .await;
        Ok(booking)
    }

    /// Gives up the booking of `slot`. Only the order that owns the slot can release it.
    pub async fn release_slot(&self, order_id: &OrderId, slot: DateTime<Utc>) -> Result<TimeSlot, SettlementError> {
        let released = self.db.release_slot(order_id, slot).await?;
        info!("🗓️ Order {order_id} released the pickup slot {slot}");
        self.producers
            .publish_slot_changed(SlotChangedEvent::new(order_id.clone(), released.clone(), SlotChange::Released))
            .await;
        Ok(released)
    }

    /// Moves a booking from `from` to `to` in one step. If `to` cannot be booked, the order keeps `from`.
    pub async fn rebook_slot(
        &self,
        order_id: &OrderId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<TimeSlot, SettlementError> {
        self.calendar.validate_slot(to, Utc::now())?;
        let (released, booking) = self.db.rebook_slot(order_id, from, to).await?;
        info!("🗓️ Order {order_id} moved its pickup from {from} to {to}");
        self.producers
            .publish_slot_changed(SlotChangedEvent::new(order_id.clone(), released, SlotChange::Released))
            .await;
        self.producers
            .publish_slot_changed(SlotChangedEvent::new(order_id.clone(), booking.clone(), SlotChange::Booked))
            .await;
        Ok(booking)
    }
}
