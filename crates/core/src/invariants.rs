//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{FieldReservation, HallReservation, BLOCKED_CUSTOMER_NAME};

/// Validate that a field reservation is internally consistent
pub fn assert_field_reservation_invariants(r: &FieldReservation) {
    debug_assert!(
        r.field_id != Uuid::nil(),
        "Field reservation {} has nil field_id",
        r.id
    );

    // Blocked records carry the sentinel customer and nothing else
    debug_assert!(
        !r.is_blocked() || r.customer.name == BLOCKED_CUSTOMER_NAME,
        "Blocked field reservation {} has customer '{}'",
        r.id,
        r.customer.name
    );
}

/// Validate that a hall reservation is internally consistent
pub fn assert_hall_reservation_invariants(r: &HallReservation) {
    debug_assert!(
        r.hall_id != Uuid::nil(),
        "Hall reservation {} has nil hall_id",
        r.id
    );

    debug_assert!(
        !r.is_blocked() || r.customer.name == BLOCKED_CUSTOMER_NAME,
        "Blocked hall reservation {} has customer '{}'",
        r.id,
        r.customer.name
    );

    // Only bookings that still hold their date need guests; an unblocked
    // sentinel is canceled with none
    debug_assert!(
        !r.status.holds_slot() || r.is_blocked() || r.guest_count > 0,
        "Hall reservation {} has no guests",
        r.id
    );
}

/// At most one held reservation per (field, date, slot)
pub fn assert_field_day_invariants(reservations: &[FieldReservation]) {
    let mut held = HashSet::new();
    for r in reservations {
        assert_field_reservation_invariants(r);
        if r.status.holds_slot() {
            debug_assert!(
                held.insert((r.field_id, r.date, r.slot)),
                "Field {} has two held reservations on {} at {}",
                r.field_id,
                r.date,
                r.slot
            );
        }
    }
}

/// At most one held reservation per (hall, date)
pub fn assert_hall_range_invariants(reservations: &[HallReservation]) {
    let mut held = HashSet::new();
    for r in reservations {
        assert_hall_reservation_invariants(r);
        if r.status.holds_slot() {
            debug_assert!(
                held.insert((r.hall_id, r.date)),
                "Hall {} has two held reservations on {}",
                r.hall_id,
                r.date
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Customer, ReservationStatus, TimeSlot};
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 20).unwrap()
    }

    fn nine() -> TimeSlot {
        TimeSlot::new(9, 0).unwrap()
    }

    #[test]
    fn test_canceled_duplicates_are_fine() {
        let field_id = Uuid::new_v4();
        let customer = Customer::new("A", "12345678");
        let mut first = FieldReservation::new(field_id, day(), nine(), customer);
        first.status = ReservationStatus::Canceled;
        let second = FieldReservation::blocked(field_id, day(), nine());
        assert_field_day_invariants(&[first, second]);
    }

    #[test]
    fn test_blocked_hall_without_guests() {
        let r = HallReservation::blocked(Uuid::new_v4(), day());
        assert_hall_reservation_invariants(&r);
    }

    #[test]
    fn test_unblocked_hall_sentinel_is_fine() {
        let mut r = HallReservation::blocked(Uuid::new_v4(), day());
        r.status = ReservationStatus::Canceled;
        assert_hall_range_invariants(&[r]);
    }

    #[test]
    #[should_panic(expected = "two held reservations")]
    fn test_double_held_slot_panics() {
        let field_id = Uuid::new_v4();
        let a = FieldReservation::new(field_id, day(), nine(), Customer::new("A", "12345678"));
        let b = FieldReservation::blocked(field_id, day(), nine());
        assert_field_day_invariants(&[a, b]);
    }

    #[test]
    #[should_panic(expected = "has customer")]
    fn test_blocked_with_real_customer_panics() {
        let customer = Customer::new("A", "12345678");
        let mut r = FieldReservation::new(Uuid::new_v4(), day(), nine(), customer);
        r.status = ReservationStatus::Blocked;
        assert_field_reservation_invariants(&r);
    }
}
