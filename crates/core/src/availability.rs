//! Slot and date availability
//!
//! Pure functions over reservation lists. Every caller (public booking,
//! admin views, the booking desk before insert) goes through these so the
//! matching rules live in one place:
//!
//! - dates compare as calendar days (`yyyy-MM-dd`)
//! - resources compare by id equality
//! - any status other than `canceled` holds the slot
//!
//! Past-time exclusion is a separate check and is only combined with the
//! booking check when building a day view.

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{FieldReservation, HallReservation, ReservationStatus, TimeSlot};

/// Who is looking at availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Public,
    Admin,
}

/// State of a slot (field) or a day (hall)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Available,
    Booked,
    Blocked,
    Past,
}

impl SlotState {
    pub fn is_available(&self) -> bool {
        *self == SlotState::Available
    }

    /// Public view: a blocked slot reads exactly like a booked one
    pub fn public(self) -> SlotState {
        match self {
            SlotState::Blocked => SlotState::Booked,
            other => other,
        }
    }

    pub fn for_audience(self, audience: Audience) -> SlotState {
        match audience {
            Audience::Public => self.public(),
            Audience::Admin => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    pub slot: TimeSlot,
    pub state: SlotState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateAvailability {
    pub date: NaiveDate,
    pub state: SlotState,
}

/// Reduce a stored or submitted date to its calendar day.
///
/// Accepts `yyyy-MM-dd`, a naive `yyyy-MM-ddTHH:MM:SS[.fff]`, or a full
/// RFC 3339 timestamp. Timestamps keep the day as written, without
/// shifting time zones.
pub fn parse_calendar_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    let day = s.get(..10).unwrap_or(s);
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("Invalid date '{}', expected yyyy-MM-dd", s)))?;

    // Anything after the day must itself be a time component
    match s.get(10..) {
        None | Some("") => Ok(date),
        Some(rest) if rest.starts_with('T') || rest.starts_with(' ') => Ok(date),
        Some(_) => Err(Error::Validation(format!(
            "Invalid date '{}', expected yyyy-MM-dd",
            s
        ))),
    }
}

/// Is this field slot held by a non-canceled reservation?
pub fn is_slot_booked(
    reservations: &[FieldReservation],
    field_id: Uuid,
    date: NaiveDate,
    slot: TimeSlot,
) -> bool {
    slot_holder(reservations, field_id, date, slot).is_some()
}

/// Is this hall date held by a non-canceled reservation?
pub fn is_date_booked(reservations: &[HallReservation], hall_id: Uuid, date: NaiveDate) -> bool {
    date_holder(reservations, hall_id, date).is_some()
}

/// The reservation holding a field slot, if any
pub fn slot_holder(
    reservations: &[FieldReservation],
    field_id: Uuid,
    date: NaiveDate,
    slot: TimeSlot,
) -> Option<&FieldReservation> {
    reservations.iter().find(|r| {
        r.field_id == field_id && r.date == date && r.slot == slot && r.status.holds_slot()
    })
}

/// The reservation holding a hall date, if any
pub fn date_holder(
    reservations: &[HallReservation],
    hall_id: Uuid,
    date: NaiveDate,
) -> Option<&HallReservation> {
    reservations
        .iter()
        .find(|r| r.hall_id == hall_id && r.date == date && r.status.holds_slot())
}

/// Is the date before today?
pub fn is_past_date(date: NaiveDate, now: NaiveDateTime) -> bool {
    date < now.date()
}

/// Has the slot already started? Past days are entirely past.
pub fn is_past_slot(date: NaiveDate, slot: TimeSlot, now: NaiveDateTime) -> bool {
    if is_past_date(date, now) {
        return true;
    }
    date == now.date() && slot.start() <= now.time()
}

/// Is the date further out than the booking horizon allows?
pub fn is_beyond_horizon(date: NaiveDate, now: NaiveDateTime, horizon_days: u32) -> bool {
    match now.date().checked_add_days(Days::new(u64::from(horizon_days))) {
        Some(last) => date > last,
        None => false,
    }
}

fn state_of(status: ReservationStatus) -> SlotState {
    match status {
        ReservationStatus::Blocked => SlotState::Blocked,
        _ => SlotState::Booked,
    }
}

/// State of every scheduled slot on one field for one day.
///
/// A held slot reports Booked/Blocked even when it is also past, so admins
/// can still see who played.
pub fn field_day(
    reservations: &[FieldReservation],
    field_id: Uuid,
    date: NaiveDate,
    slots: &[TimeSlot],
    now: NaiveDateTime,
) -> Vec<SlotAvailability> {
    slots
        .iter()
        .map(|&slot| {
            let state = match slot_holder(reservations, field_id, date, slot) {
                Some(r) => state_of(r.status),
                None if is_past_slot(date, slot, now) => SlotState::Past,
                None => SlotState::Available,
            };
            SlotAvailability { slot, state }
        })
        .collect()
}

/// State of a hall for `days` consecutive days starting at `from`
pub fn hall_days(
    reservations: &[HallReservation],
    hall_id: Uuid,
    from: NaiveDate,
    days: u32,
    now: NaiveDateTime,
) -> Vec<DateAvailability> {
    from.iter_days()
        .take(days as usize)
        .map(|date| {
            let state = match date_holder(reservations, hall_id, date) {
                Some(r) => state_of(r.status),
                None if is_past_date(date, now) => SlotState::Past,
                None => SlotState::Available,
            };
            DateAvailability { date, state }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Customer, EventHall};

    fn date(s: &str) -> NaiveDate {
        parse_calendar_date(s).unwrap()
    }

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn field_booking(
        field_id: Uuid,
        d: &str,
        s: &str,
        status: ReservationStatus,
    ) -> FieldReservation {
        let customer = Customer::new("Sami", "+21620000000");
        let mut r = FieldReservation::new(field_id, date(d), slot(s), customer);
        r.status = status;
        r
    }

    #[test]
    fn test_example_list() {
        let field = Uuid::new_v4();
        let list = vec![field_booking(field, "2026-01-20", "09:00", ReservationStatus::Confirmed)];

        assert!(is_slot_booked(&list, field, date("2026-01-20"), slot("09:00")));
        assert!(!is_slot_booked(&list, field, date("2026-01-20"), slot("10:30")));
        assert!(!is_slot_booked(&list, field, date("2026-01-21"), slot("09:00")));
    }

    #[test]
    fn test_other_field_does_not_match() {
        let field = Uuid::new_v4();
        let list = vec![field_booking(field, "2026-01-20", "09:00", ReservationStatus::Pending)];

        assert!(!is_slot_booked(&list, Uuid::new_v4(), date("2026-01-20"), slot("09:00")));
    }

    #[test]
    fn test_canceled_frees_slot() {
        let field = Uuid::new_v4();
        let mut list = vec![field_booking(
            field,
            "2026-01-20",
            "09:00",
            ReservationStatus::Pending,
        )];
        assert!(is_slot_booked(&list, field, date("2026-01-20"), slot("09:00")));

        list[0].status = ReservationStatus::Canceled;
        assert!(!is_slot_booked(&list, field, date("2026-01-20"), slot("09:00")));
    }

    #[test]
    fn test_blocked_reads_as_booked_publicly() {
        let field = Uuid::new_v4();
        let list = vec![FieldReservation::blocked(field, date("2026-01-20"), slot("09:00"))];
        let now = at("2026-01-19 12:00");

        assert!(is_slot_booked(&list, field, date("2026-01-20"), slot("09:00")));

        let day = field_day(&list, field, date("2026-01-20"), &[slot("09:00")], now);
        assert_eq!(day[0].state, SlotState::Blocked);
        assert_eq!(day[0].state.public(), SlotState::Booked);
        assert_eq!(day[0].state.for_audience(Audience::Admin), SlotState::Blocked);
    }

    #[test]
    fn test_timestamp_dates_compare_by_day() {
        assert_eq!(date("2026-01-20T00:00:00.000Z"), date("2026-01-20"));
        assert_eq!(date("2026-01-20T23:30:00+01:00"), date("2026-01-20"));
        assert_eq!(date("2026-01-20 18:00:00"), date("2026-01-20"));
        assert!(parse_calendar_date("2026-01-20xyz").is_err());
        assert!(parse_calendar_date("20/01/2026").is_err());
    }

    #[test]
    fn test_past_slot_same_day() {
        let now = at("2026-01-20 10:15");
        let today = date("2026-01-20");

        assert!(is_past_slot(today, slot("09:00"), now));
        assert!(is_past_slot(today, slot("10:15"), now));
        assert!(!is_past_slot(today, slot("10:30"), now));
        assert!(is_past_slot(date("2026-01-19"), slot("22:30"), now));
        assert!(!is_past_slot(date("2026-01-21"), slot("09:00"), now));
    }

    #[test]
    fn test_horizon() {
        let now = at("2026-01-20 10:00");
        assert!(!is_beyond_horizon(date("2026-04-20"), now, 90));
        assert!(is_beyond_horizon(date("2026-04-21"), now, 90));
    }

    #[test]
    fn test_field_day_states() {
        let field = Uuid::new_v4();
        let list = vec![
            field_booking(field, "2026-01-20", "12:00", ReservationStatus::Confirmed),
            field_booking(field, "2026-01-20", "13:30", ReservationStatus::Canceled),
        ];
        let slots = TimeSlot::series(slot("09:00"), 90, 4);
        let now = at("2026-01-20 10:00");

        let states: Vec<SlotState> = field_day(&list, field, date("2026-01-20"), &slots, now)
            .into_iter()
            .map(|s| s.state)
            .collect();

        assert_eq!(
            states,
            vec![
                SlotState::Past,
                SlotState::Available,
                SlotState::Booked,
                SlotState::Available
            ]
        );
    }

    #[test]
    fn test_hall_days() {
        let hall = EventHall::new("Garden Hall".to_string(), 120);
        let mut wedding = HallReservation::new(
            hall.id,
            date("2026-03-14"),
            Customer::new("Lina", "+21655555555"),
            "wedding".to_string(),
            100,
        );
        wedding.status = ReservationStatus::Confirmed;
        let list = vec![wedding, HallReservation::blocked(hall.id, date("2026-03-15"))];
        let now = at("2026-03-13 09:00");

        assert!(is_date_booked(&list, hall.id, date("2026-03-14")));
        assert!(!is_date_booked(&list, hall.id, date("2026-03-16")));

        let days = hall_days(&list, hall.id, date("2026-03-12"), 5, now);
        let states: Vec<SlotState> = days.iter().map(|d| d.state).collect();
        assert_eq!(
            states,
            vec![
                SlotState::Past,
                SlotState::Available,
                SlotState::Booked,
                SlotState::Blocked,
                SlotState::Available
            ]
        );
        assert_eq!(days[4].date, date("2026-03-16"));
    }
}
