use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, SecondsFormat, TimeZone, Timelike, Utc};
use thiserror::Error;

use crate::errors::ValidationError;

#[derive(Debug, Clone, Error)]
#[error("Invalid slot calendar: {0}")]
pub struct InvalidSlotCalendar(String);

/// The daily grid of bookable pickup slots.
///
/// Slots start every `granularity` from `open`, and the last one starts strictly before `close`. Times are wall-clock
/// times at `utc_offset`, so a store in Lagos configures an offset of +01:00 and an open time of 09:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCalendar {
    open: NaiveTime,
    close: NaiveTime,
    granularity: Duration,
    utc_offset: FixedOffset,
}

impl Default for SlotCalendar {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default(),
            granularity: Duration::minutes(10),
            utc_offset: Utc.fix(),
        }
    }
}

impl SlotCalendar {
    pub fn new(
        open: NaiveTime,
        close: NaiveTime,
        granularity: Duration,
        utc_offset: FixedOffset,
    ) -> Result<Self, InvalidSlotCalendar> {
        if open >= close {
            return Err(InvalidSlotCalendar(format!("The window opens at {open}, which is not before {close}")));
        }
        if granularity < Duration::minutes(1) || granularity.num_seconds() % 60 != 0 {
            return Err(InvalidSlotCalendar(format!(
                "Slots must be a whole number of minutes long, not {}s",
                granularity.num_seconds()
            )));
        }
        if open.second() != 0 || open.nanosecond() != 0 {
            return Err(InvalidSlotCalendar(format!("The window must open on a whole minute, not {open}")));
        }
        Ok(Self { open, close, granularity, utc_offset })
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    pub fn granularity(&self) -> Duration {
        self.granularity
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.utc_offset
    }

    /// The slots on `date` (a local calendar date) that start strictly after `now`. Past dates have none.
    pub fn slots_for_date(&self, date: NaiveDate, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let close = date.and_time(self.close);
        let mut local = date.and_time(self.open);
        let mut result = Vec::new();
        while local < close {
            let starts_at = Utc.from_utc_datetime(&(local - self.utc_offset));
            if starts_at > now {
                result.push(starts_at);
            }
            local += self.granularity;
        }
        result
    }

    /// The local calendar date `slot` falls on.
    pub fn local_date(&self, slot: DateTime<Utc>) -> NaiveDate {
        slot.with_timezone(&self.utc_offset).date_naive()
    }

    /// Checks that `slot` lies inside the daily window, on the grid, and after `now`.
    pub fn validate_slot(&self, slot: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ValidationError> {
        let time = slot.with_timezone(&self.utc_offset).time();
        if time < self.open || time >= self.close {
            return Err(ValidationError::SlotOutsideWindow(slot));
        }
        let since_open = time - self.open;
        let on_grid = time.nanosecond() == 0 && since_open.num_seconds() % self.granularity.num_seconds() == 0;
        if !on_grid {
            return Err(ValidationError::SlotOffGrid { slot, granularity: self.granularity.num_minutes() });
        }
        if slot <= now {
            return Err(ValidationError::SlotInPast(slot));
        }
        Ok(())
    }
}

/// The storage key for a slot: the UTC start time in RFC 3339 with whole seconds, e.g. `2025-01-10T09:00:00Z`.
pub fn slot_key(slot: &DateTime<Utc>) -> String {
    slot.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_slot_key(key: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(key).map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod test {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn future_days_get_the_whole_window() {
        let cal = SlotCalendar::default();
        let slots = cal.slots_for_date(date(2099, 1, 10), t("2025-01-01T00:00:00Z"));
        assert_eq!(slots.len(), 72);
        assert_eq!(slots[0], t("2099-01-10T09:00:00Z"));
        assert_eq!(slots[1], t("2099-01-10T09:10:00Z"));
        assert_eq!(slots[71], t("2099-01-10T20:50:00Z"));
    }

    #[test]
    fn today_starts_after_now() {
        let cal = SlotCalendar::default();
        let now = t("2030-03-01T12:34:56Z");
        let slots = cal.slots_for_date(date(2030, 3, 1), now);
        assert_eq!(slots[0], t("2030-03-01T12:40:00Z"));
        assert_eq!(slots.last().copied(), Some(t("2030-03-01T20:50:00Z")));
        // Exactly on a boundary: that boundary has already started
        let slots = cal.slots_for_date(date(2030, 3, 1), t("2030-03-01T12:40:00Z"));
        assert_eq!(slots[0], t("2030-03-01T12:50:00Z"));
        assert!(cal.slots_for_date(date(2030, 2, 28), now).is_empty());
        assert!(cal.slots_for_date(date(2030, 3, 1), t("2030-03-01T21:00:00Z")).is_empty());
    }

    #[test]
    fn offsets_shift_the_window() {
        let lagos = FixedOffset::east_opt(3600).unwrap();
        let cal = SlotCalendar::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            Duration::minutes(30),
            lagos,
        )
        .unwrap();
        let slots = cal.slots_for_date(date(2099, 6, 1), t("2025-01-01T00:00:00Z"));
        assert_eq!(slots, vec![t("2099-06-01T08:00:00Z"), t("2099-06-01T08:30:00Z")]);
        assert_eq!(cal.local_date(t("2099-06-01T23:30:00Z")), date(2099, 6, 2));
    }

    #[test]
    fn slots_must_be_on_the_grid_and_inside_the_window() {
        let cal = SlotCalendar::default();
        let now = t("2025-01-01T00:00:00Z");
        assert!(cal.validate_slot(t("2099-01-10T09:00:00Z"), now).is_ok());
        assert!(cal.validate_slot(t("2099-01-10T20:50:00Z"), now).is_ok());
        assert!(matches!(
            cal.validate_slot(t("2099-01-10T09:05:00Z"), now),
            Err(ValidationError::SlotOffGrid { granularity: 10, .. })
        ));
        assert!(matches!(
            cal.validate_slot(t("2099-01-10T09:10:30Z"), now),
            Err(ValidationError::SlotOffGrid { .. })
        ));
        assert!(matches!(cal.validate_slot(t("2099-01-10T21:00:00Z"), now), Err(ValidationError::SlotOutsideWindow(_))));
        assert!(matches!(cal.validate_slot(t("2099-01-10T08:50:00Z"), now), Err(ValidationError::SlotOutsideWindow(_))));
        assert!(matches!(
            cal.validate_slot(t("2024-12-31T09:00:00Z"), now),
            Err(ValidationError::SlotInPast(_))
        ));
    }

    #[test]
    fn bad_calendars_are_refused() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        assert!(SlotCalendar::new(nine, nine, Duration::minutes(10), utc).is_err());
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        assert!(SlotCalendar::new(nine, five, Duration::seconds(90), utc).is_err());
        assert!(SlotCalendar::new(nine, five, Duration::zero(), utc).is_err());
    }

    #[test]
    fn slot_keys() {
        let slot = t("2025-01-10T09:00:00Z");
        assert_eq!(slot_key(&slot), "2025-01-10T09:00:00Z");
        assert_eq!(parse_slot_key("2025-01-10T10:00:00+01:00").unwrap(), slot);
        assert!(parse_slot_key("10 Jan 2025").is_err());
    }
}
