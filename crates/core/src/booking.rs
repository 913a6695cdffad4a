//! Booking desk - the single entry point for reading and changing reservations
//!
//! Every availability answer goes through [`crate::availability`]; every write
//! goes through the storage traits, whose unique indexes make the final call
//! when two requests race for the same slot.

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::availability::{self, Audience, DateAvailability, SlotAvailability};
use crate::config::BookingRules;
use crate::error::{Error, Result};
use crate::invariants;
use crate::models::{
    AuditAction, AuditEntry, Customer, EventHall, Field, FieldReservation, HallReservation,
    ReservationFilter, ReservationKind, ReservationStatus, TimeSlot,
};
use crate::recurrence::weekly_dates;
use crate::storage::Storage;
use crate::validation::{require_text, validate_customer};

/// Longest hall calendar served in one call
pub const MAX_CALENDAR_DAYS: u32 = 62;

/// Public booking form for a field slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldBookingRequest {
    pub field_id: Uuid,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub customer: Customer,
}

/// Public booking form for an event hall
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallBookingRequest {
    pub hall_id: Uuid,
    pub date: NaiveDate,
    pub customer: Customer,
    pub event_type: String,
    pub guest_count: u32,
    #[serde(default)]
    pub message: Option<String>,
}

pub struct BookingDesk<S> {
    store: S,
    rules: BookingRules,
}

impl<S: Storage> BookingDesk<S> {
    pub fn new(store: S, rules: BookingRules) -> Self {
        Self { store, rules }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    // ---------------------------------------------------------------------
    // Catalogue
    // ---------------------------------------------------------------------

    pub fn list_fields(&self, include_inactive: bool) -> Result<Vec<Field>> {
        self.store.list_fields(include_inactive)
    }

    pub fn list_halls(&self, include_inactive: bool) -> Result<Vec<EventHall>> {
        self.store.list_halls(include_inactive)
    }

    #[instrument(skip(self))]
    pub fn add_field(&self, name: &str, surface: Option<String>) -> Result<Field> {
        let name = require_text(name, "Field name")?;
        if self.store.find_field_by_name(&name)?.is_some() {
            return Err(Error::Validation(format!("A field named '{}' already exists", name)));
        }

        let mut field = Field::new(name);
        field.surface = surface.filter(|s| !s.trim().is_empty());
        self.store.create_field(&field)?;
        info!(field_id = %field.id, name = %field.name, "Field added");
        Ok(field)
    }

    #[instrument(skip(self))]
    pub fn add_hall(&self, name: &str, capacity: u32) -> Result<EventHall> {
        let name = require_text(name, "Hall name")?;
        if capacity == 0 {
            return Err(Error::Validation("Hall capacity must be positive".into()));
        }
        if self.store.find_hall_by_name(&name)?.is_some() {
            return Err(Error::Validation(format!("A hall named '{}' already exists", name)));
        }

        let hall = EventHall::new(name, capacity);
        self.store.create_hall(&hall)?;
        info!(hall_id = %hall.id, name = %hall.name, "Hall added");
        Ok(hall)
    }

    #[instrument(skip(self))]
    pub fn set_field_active(&self, field_id: Uuid, is_active: bool) -> Result<()> {
        if !self.store.set_field_active(field_id, is_active)? {
            return Err(Error::NotFound(format!("field {}", field_id)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn set_hall_active(&self, hall_id: Uuid, is_active: bool) -> Result<()> {
        if !self.store.set_hall_active(hall_id, is_active)? {
            return Err(Error::NotFound(format!("hall {}", hall_id)));
        }
        Ok(())
    }

    fn field(&self, field_id: Uuid) -> Result<Field> {
        self.store
            .find_field(field_id)?
            .ok_or_else(|| Error::NotFound(format!("field {}", field_id)))
    }

    fn hall(&self, hall_id: Uuid) -> Result<EventHall> {
        self.store
            .find_hall(hall_id)?
            .ok_or_else(|| Error::NotFound(format!("hall {}", hall_id)))
    }

    fn bookable_field(&self, field_id: Uuid) -> Result<Field> {
        let field = self.field(field_id)?;
        if !field.is_active {
            return Err(Error::Validation(format!(
                "Field '{}' is not open for booking",
                field.name
            )));
        }
        Ok(field)
    }

    fn bookable_hall(&self, hall_id: Uuid) -> Result<EventHall> {
        let hall = self.hall(hall_id)?;
        if !hall.is_active {
            return Err(Error::Validation(format!("Hall '{}' is not open for booking", hall.name)));
        }
        Ok(hall)
    }

    // ---------------------------------------------------------------------
    // Availability
    // ---------------------------------------------------------------------

    /// Every scheduled slot on a field for one day
    #[instrument(skip(self, now))]
    pub fn field_day(
        &self,
        field_id: Uuid,
        date: NaiveDate,
        now: NaiveDateTime,
        audience: Audience,
    ) -> Result<Vec<SlotAvailability>> {
        self.field(field_id)?;
        let reservations = self.store.field_reservations_on(field_id, date)?;
        invariants::assert_field_day_invariants(&reservations);

        Ok(
            availability::field_day(&reservations, field_id, date, &self.rules.slots, now)
                .into_iter()
                .map(|s| SlotAvailability {
                    state: s.state.for_audience(audience),
                    ..s
                })
                .collect(),
        )
    }

    /// A hall's calendar for `days` days starting at `from`
    #[instrument(skip(self, now))]
    pub fn hall_days(
        &self,
        hall_id: Uuid,
        from: NaiveDate,
        days: u32,
        now: NaiveDateTime,
        audience: Audience,
    ) -> Result<Vec<DateAvailability>> {
        if days == 0 || days > MAX_CALENDAR_DAYS {
            return Err(Error::Validation(format!(
                "Calendar must cover 1 to {} days",
                MAX_CALENDAR_DAYS
            )));
        }
        self.hall(hall_id)?;

        let to = from
            .checked_add_days(Days::new(u64::from(days - 1)))
            .ok_or_else(|| Error::Validation(format!("Date out of range after {}", from)))?;
        let reservations = self.store.hall_reservations_between(hall_id, from, to)?;
        invariants::assert_hall_range_invariants(&reservations);

        Ok(availability::hall_days(&reservations, hall_id, from, days, now)
            .into_iter()
            .map(|d| DateAvailability {
                state: d.state.for_audience(audience),
                ..d
            })
            .collect())
    }

    pub fn is_slot_booked(&self, field_id: Uuid, date: NaiveDate, slot: TimeSlot) -> Result<bool> {
        let reservations = self.store.field_reservations_on(field_id, date)?;
        Ok(availability::is_slot_booked(&reservations, field_id, date, slot))
    }

    pub fn is_hall_date_booked(&self, hall_id: Uuid, date: NaiveDate) -> Result<bool> {
        let reservations = self.store.hall_reservations_between(hall_id, date, date)?;
        Ok(availability::is_date_booked(&reservations, hall_id, date))
    }

    fn ensure_slot_free(&self, field_id: Uuid, date: NaiveDate, slot: TimeSlot) -> Result<()> {
        if self.is_slot_booked(field_id, date, slot)? {
            return Err(Error::SlotTaken(format!("{} at {}", date, slot)));
        }
        Ok(())
    }

    fn ensure_date_free(&self, hall_id: Uuid, date: NaiveDate) -> Result<()> {
        if self.is_hall_date_booked(hall_id, date)? {
            return Err(Error::SlotTaken(format!("{}", date)));
        }
        Ok(())
    }

    fn ensure_offered(&self, slot: TimeSlot) -> Result<()> {
        if !self.rules.offers(slot) {
            return Err(Error::Validation(format!("{} is not a bookable slot", slot)));
        }
        Ok(())
    }

    fn ensure_within_horizon(&self, date: NaiveDate, now: NaiveDateTime) -> Result<()> {
        if availability::is_beyond_horizon(date, now, self.rules.horizon_days) {
            return Err(Error::Validation(format!(
                "Bookings open at most {} days ahead",
                self.rules.horizon_days
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Public booking
    // ---------------------------------------------------------------------

    /// Book a field slot from the public form. Creates a pending reservation.
    #[instrument(
        skip(self, request, now),
        fields(field_id = %request.field_id, date = %request.date, slot = %request.slot)
    )]
    pub fn book_field(
        &self,
        request: &FieldBookingRequest,
        now: NaiveDateTime,
    ) -> Result<FieldReservation> {
        self.bookable_field(request.field_id)?;
        self.ensure_offered(request.slot)?;
        let customer = validate_customer(&request.customer)?;

        if availability::is_past_slot(request.date, request.slot, now) {
            return Err(Error::PastSlot(format!("{} at {}", request.date, request.slot)));
        }
        self.ensure_within_horizon(request.date, now)?;
        self.ensure_slot_free(request.field_id, request.date, request.slot)?;

        let reservation =
            FieldReservation::new(request.field_id, request.date, request.slot, customer);
        self.store.create_field_reservation(&reservation)?;
        self.audit_created(ReservationKind::Field, reservation.id, reservation.status);

        info!(reservation_id = %reservation.id, "Field reservation created");
        Ok(reservation)
    }

    /// Book a hall day from the public form. Creates a pending reservation.
    #[instrument(
        skip(self, request, now),
        fields(hall_id = %request.hall_id, date = %request.date)
    )]
    pub fn book_hall(
        &self,
        request: &HallBookingRequest,
        now: NaiveDateTime,
    ) -> Result<HallReservation> {
        let hall = self.bookable_hall(request.hall_id)?;
        let customer = validate_customer(&request.customer)?;
        let event_type = require_text(&request.event_type, "Event type")?;

        if request.guest_count == 0 || request.guest_count > hall.capacity {
            return Err(Error::Validation(format!(
                "Guest count must be between 1 and {}",
                hall.capacity
            )));
        }
        if availability::is_past_date(request.date, now) {
            return Err(Error::PastSlot(format!("{}", request.date)));
        }
        self.ensure_within_horizon(request.date, now)?;
        self.ensure_date_free(request.hall_id, request.date)?;

        let mut reservation = HallReservation::new(
            request.hall_id,
            request.date,
            customer,
            event_type,
            request.guest_count,
        );
        reservation.message = request
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        self.store.create_hall_reservation(&reservation)?;
        self.audit_created(ReservationKind::Hall, reservation.id, reservation.status);

        info!(reservation_id = %reservation.id, "Hall reservation created");
        Ok(reservation)
    }

    // ---------------------------------------------------------------------
    // Admin
    // ---------------------------------------------------------------------

    /// Weekly customer series created by an admin; confirmed on creation.
    /// All occurrences are written or none.
    #[instrument(
        skip(self, request, now),
        fields(field_id = %request.field_id, date = %request.date, slot = %request.slot)
    )]
    pub fn book_field_recurring(
        &self,
        request: &FieldBookingRequest,
        weeks: u32,
        now: NaiveDateTime,
    ) -> Result<Vec<FieldReservation>> {
        self.bookable_field(request.field_id)?;
        self.ensure_offered(request.slot)?;
        let customer = validate_customer(&request.customer)?;
        if availability::is_past_slot(request.date, request.slot, now) {
            return Err(Error::PastSlot(format!("{} at {}", request.date, request.slot)));
        }

        let dates = weekly_dates(request.date, weeks, self.rules.max_recurrence_weeks)?;
        let group = Uuid::new_v4();
        let batch = self.field_series(request.field_id, &dates, request.slot, group, |date| {
            let mut r =
                FieldReservation::new(request.field_id, date, request.slot, customer.clone());
            r.status = ReservationStatus::Confirmed;
            r
        })?;

        info!(group_id = %group, count = batch.len(), "Recurring field reservations created");
        Ok(batch)
    }

    /// Mark a field slot unavailable, optionally for several weeks
    #[instrument(skip(self, now))]
    pub fn block_field_slot(
        &self,
        field_id: Uuid,
        date: NaiveDate,
        slot: TimeSlot,
        weeks: u32,
        now: NaiveDateTime,
    ) -> Result<Vec<FieldReservation>> {
        self.field(field_id)?;
        self.ensure_offered(slot)?;
        if availability::is_past_slot(date, slot, now) {
            return Err(Error::PastSlot(format!("{} at {}", date, slot)));
        }

        let dates = weekly_dates(date, weeks, self.rules.max_recurrence_weeks)?;
        let group = Uuid::new_v4();
        let batch = self.field_series(field_id, &dates, slot, group, |d| {
            FieldReservation::blocked(field_id, d, slot)
        })?;

        info!(count = batch.len(), "Field slot blocked");
        Ok(batch)
    }

    fn field_series(
        &self,
        field_id: Uuid,
        dates: &[NaiveDate],
        slot: TimeSlot,
        group: Uuid,
        make: impl Fn(NaiveDate) -> FieldReservation,
    ) -> Result<Vec<FieldReservation>> {
        for &date in dates {
            self.ensure_slot_free(field_id, date, slot)?;
        }

        let grouped = dates.len() > 1;
        let batch: Vec<FieldReservation> = dates
            .iter()
            .map(|&d| {
                let r = make(d);
                if grouped {
                    r.in_group(group)
                } else {
                    r
                }
            })
            .collect();

        self.store.create_field_reservations(&batch)?;
        for r in &batch {
            self.audit_created(ReservationKind::Field, r.id, r.status);
        }
        Ok(batch)
    }

    /// Mark a hall date unavailable, optionally for several weeks
    #[instrument(skip(self, now))]
    pub fn block_hall_date(
        &self,
        hall_id: Uuid,
        date: NaiveDate,
        weeks: u32,
        now: NaiveDateTime,
    ) -> Result<Vec<HallReservation>> {
        self.hall(hall_id)?;
        if availability::is_past_date(date, now) {
            return Err(Error::PastSlot(format!("{}", date)));
        }

        let dates = weekly_dates(date, weeks, self.rules.max_recurrence_weeks)?;
        for &d in &dates {
            self.ensure_date_free(hall_id, d)?;
        }

        let group = Uuid::new_v4();
        let grouped = dates.len() > 1;
        let batch: Vec<HallReservation> = dates
            .iter()
            .map(|&d| {
                let r = HallReservation::blocked(hall_id, d);
                if grouped {
                    r.in_group(group)
                } else {
                    r
                }
            })
            .collect();

        self.store.create_hall_reservations(&batch)?;
        for r in &batch {
            self.audit_created(ReservationKind::Hall, r.id, r.status);
        }

        info!(count = batch.len(), "Hall date blocked");
        Ok(batch)
    }

    /// Admin status change. Setting the current status again is a no-op.
    #[instrument(skip(self))]
    pub fn set_field_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
    ) -> Result<FieldReservation> {
        let mut reservation = self
            .store
            .find_field_reservation(id)?
            .ok_or_else(|| Error::NotFound(format!("field reservation {}", id)))?;

        let from = reservation.status;
        if from == status {
            return Ok(reservation);
        }
        if !from.can_transition_to(status) {
            return Err(Error::InvalidTransition { from, to: status });
        }

        if !self.store.update_field_reservation_status(id, status)? {
            return Err(Error::NotFound(format!("field reservation {}", id)));
        }
        reservation.status = status;
        self.audit_status(ReservationKind::Field, id, from, status);

        info!(%from, to = %status, "Field reservation status changed");
        Ok(reservation)
    }

    #[instrument(skip(self))]
    pub fn set_hall_status(&self, id: Uuid, status: ReservationStatus) -> Result<HallReservation> {
        let mut reservation = self
            .store
            .find_hall_reservation(id)?
            .ok_or_else(|| Error::NotFound(format!("hall reservation {}", id)))?;

        let from = reservation.status;
        if from == status {
            return Ok(reservation);
        }
        if !from.can_transition_to(status) {
            return Err(Error::InvalidTransition { from, to: status });
        }

        if !self.store.update_hall_reservation_status(id, status)? {
            return Err(Error::NotFound(format!("hall reservation {}", id)));
        }
        reservation.status = status;
        self.audit_status(ReservationKind::Hall, id, from, status);

        info!(%from, to = %status, "Hall reservation status changed");
        Ok(reservation)
    }

    /// Cancel every held reservation of a recurrence group (fields and halls).
    /// Returns how many were canceled.
    #[instrument(skip(self))]
    pub fn cancel_group(&self, group_id: Uuid) -> Result<usize> {
        let fields = self.store.cancel_field_group(group_id)?;
        let halls = self.store.cancel_hall_group(group_id)?;

        for (id, from) in &fields {
            self.audit_status(ReservationKind::Field, *id, *from, ReservationStatus::Canceled);
        }
        for (id, from) in &halls {
            self.audit_status(ReservationKind::Hall, *id, *from, ReservationStatus::Canceled);
        }

        let count = fields.len() + halls.len();
        if count == 0 {
            return Err(Error::NotFound(format!("active reservations in group {}", group_id)));
        }
        info!(count, "Recurrence group canceled");
        Ok(count)
    }

    /// Hard delete; returns the removed reservation
    #[instrument(skip(self))]
    pub fn delete_field_reservation(&self, id: Uuid) -> Result<FieldReservation> {
        let reservation = self
            .store
            .find_field_reservation(id)?
            .ok_or_else(|| Error::NotFound(format!("field reservation {}", id)))?;
        self.store.delete_field_reservation(id)?;
        self.audit(AuditEntry::new(
            ReservationKind::Field,
            id,
            AuditAction::Deleted,
            Some(reservation.status),
            None,
        ));
        info!("Field reservation deleted");
        Ok(reservation)
    }

    #[instrument(skip(self))]
    pub fn delete_hall_reservation(&self, id: Uuid) -> Result<HallReservation> {
        let reservation = self
            .store
            .find_hall_reservation(id)?
            .ok_or_else(|| Error::NotFound(format!("hall reservation {}", id)))?;
        self.store.delete_hall_reservation(id)?;
        self.audit(AuditEntry::new(
            ReservationKind::Hall,
            id,
            AuditAction::Deleted,
            Some(reservation.status),
            None,
        ));
        info!("Hall reservation deleted");
        Ok(reservation)
    }

    pub fn field_reservations(&self, filter: &ReservationFilter) -> Result<Vec<FieldReservation>> {
        self.store.list_field_reservations(filter)
    }

    pub fn hall_reservations(&self, filter: &ReservationFilter) -> Result<Vec<HallReservation>> {
        self.store.list_hall_reservations(filter)
    }

    pub fn audit_log(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        self.store.recent_audit(limit)
    }

    // ---------------------------------------------------------------------
    // Audit helpers
    // ---------------------------------------------------------------------

    fn audit_created(&self, kind: ReservationKind, id: Uuid, status: ReservationStatus) {
        self.audit(AuditEntry::new(kind, id, AuditAction::Created, None, Some(status)));
    }

    fn audit_status(
        &self,
        kind: ReservationKind,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
    ) {
        self.audit(AuditEntry::new(
            kind,
            id,
            AuditAction::StatusChanged,
            Some(from),
            Some(to),
        ));
    }

    /// The change is already committed; a failed audit write is logged, not raised
    fn audit(&self, entry: AuditEntry) {
        if let Err(e) = self.store.record_audit(&entry) {
            warn!(
                error = %e,
                reservation_id = %entry.reservation_id,
                "Failed to write audit entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::SlotState;
    use crate::storage::Database;

    fn desk() -> BookingDesk<Database> {
        BookingDesk::new(Database::open_in_memory().unwrap(), BookingRules::default())
    }

    fn date(s: &str) -> NaiveDate {
        availability::parse_calendar_date(s).unwrap()
    }

    fn slot(s: &str) -> TimeSlot {
        s.parse().unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-01-19 08:00", "%Y-%m-%d %H:%M").unwrap()
    }

    fn field_request(field_id: Uuid, d: &str, s: &str) -> FieldBookingRequest {
        FieldBookingRequest {
            field_id,
            date: date(d),
            slot: slot(s),
            customer: Customer::new("Sami", "+216 20 123 456"),
        }
    }

    fn hall_request(hall_id: Uuid, d: &str, guests: u32) -> HallBookingRequest {
        HallBookingRequest {
            hall_id,
            date: date(d),
            customer: Customer::new("Lina", "55555555"),
            event_type: "birthday".to_string(),
            guest_count: guests,
            message: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_book_then_slot_is_taken() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();

        let r = desk.book_field(&field_request(field.id, "2026-01-20", "09:00"), now()).unwrap();
        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.customer.phone, "+21620123456");

        assert!(desk.is_slot_booked(field.id, date("2026-01-20"), slot("09:00")).unwrap());
        assert!(!desk.is_slot_booked(field.id, date("2026-01-20"), slot("10:30")).unwrap());
        assert!(!desk.is_slot_booked(field.id, date("2026-01-21"), slot("09:00")).unwrap());

        let err = desk
            .book_field(&field_request(field.id, "2026-01-20", "09:00"), now())
            .unwrap_err();
        assert!(matches!(err, Error::SlotTaken(_)));
    }

    #[test]
    fn test_cancel_frees_slot() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();
        let r = desk.book_field(&field_request(field.id, "2026-01-20", "09:00"), now()).unwrap();

        desk.set_field_status(r.id, ReservationStatus::Canceled).unwrap();
        assert!(!desk.is_slot_booked(field.id, date("2026-01-20"), slot("09:00")).unwrap());
        desk.book_field(&field_request(field.id, "2026-01-20", "09:00"), now()).unwrap();
    }

    #[test]
    fn test_past_and_unscheduled_slots_rejected() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();
        let late_morning =
            NaiveDateTime::parse_from_str("2026-01-20 11:00", "%Y-%m-%d %H:%M").unwrap();

        let err = desk
            .book_field(&field_request(field.id, "2026-01-20", "10:30"), late_morning)
            .unwrap_err();
        assert!(matches!(err, Error::PastSlot(_)));

        let err = desk
            .book_field(&field_request(field.id, "2026-01-20", "11:00"), late_morning)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        desk.book_field(&field_request(field.id, "2026-01-20", "12:00"), late_morning).unwrap();
    }

    #[test]
    fn test_horizon_enforced_for_customers() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();
        let err = desk
            .book_field(&field_request(field.id, "2026-06-01", "09:00"), now())
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_inactive_field_refuses_bookings() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();
        desk.set_field_active(field.id, false).unwrap();

        assert!(desk
            .book_field(&field_request(field.id, "2026-01-20", "09:00"), now())
            .is_err());
        assert!(desk.list_fields(false).unwrap().is_empty());
        assert!(matches!(
            desk.set_field_active(Uuid::new_v4(), true).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_blocked_slot_public_vs_admin() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();
        desk.block_field_slot(field.id, date("2026-01-20"), slot("09:00"), 1, now())
            .unwrap();

        let public = desk
            .field_day(field.id, date("2026-01-20"), now(), Audience::Public)
            .unwrap();
        assert_eq!(public[0].state, SlotState::Booked);
        assert!(public[1].state.is_available());

        let admin = desk
            .field_day(field.id, date("2026-01-20"), now(), Audience::Admin)
            .unwrap();
        assert_eq!(admin[0].state, SlotState::Blocked);

        let err = desk
            .book_field(&field_request(field.id, "2026-01-20", "09:00"), now())
            .unwrap_err();
        assert!(matches!(err, Error::SlotTaken(_)));
    }

    #[test]
    fn test_block_weekly_and_cancel_group() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();
        let blocks = desk
            .block_field_slot(field.id, date("2026-01-20"), slot("18:00"), 4, now())
            .unwrap();
        assert_eq!(blocks.len(), 4);
        let group = blocks[0].recurrence_group.unwrap();
        assert!(blocks.iter().all(|b| b.recurrence_group == Some(group)));
        assert!(desk.is_slot_booked(field.id, date("2026-02-10"), slot("18:00")).unwrap());

        assert_eq!(desk.cancel_group(group).unwrap(), 4);
        assert!(!desk.is_slot_booked(field.id, date("2026-02-10"), slot("18:00")).unwrap());
        assert!(matches!(desk.cancel_group(group).unwrap_err(), Error::NotFound(_)));
    }

    #[test]
    fn test_recurring_series_is_all_or_nothing() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();
        desk.book_field(&field_request(field.id, "2026-02-03", "19:30"), now()).unwrap();

        let err = desk
            .book_field_recurring(&field_request(field.id, "2026-01-20", "19:30"), 3, now())
            .unwrap_err();
        assert!(matches!(err, Error::SlotTaken(_)));
        assert!(!desk.is_slot_booked(field.id, date("2026-01-20"), slot("19:30")).unwrap());

        let series = desk
            .book_field_recurring(&field_request(field.id, "2026-01-20", "21:00"), 3, now())
            .unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.iter().all(|r| r.status == ReservationStatus::Confirmed));
    }

    #[test]
    fn test_status_rules() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();
        let r = desk.book_field(&field_request(field.id, "2026-01-20", "09:00"), now()).unwrap();

        let confirmed = desk.set_field_status(r.id, ReservationStatus::Confirmed).unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);

        // Same status again is a no-op
        desk.set_field_status(r.id, ReservationStatus::Confirmed).unwrap();

        let err = desk.set_field_status(r.id, ReservationStatus::Pending).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        desk.set_field_status(r.id, ReservationStatus::Canceled).unwrap();
        let err = desk.set_field_status(r.id, ReservationStatus::Confirmed).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let err = desk
            .set_field_status(Uuid::new_v4(), ReservationStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_hall_booking_rules() {
        let desk = desk();
        let hall = desk.add_hall("Garden Hall", 100).unwrap();

        let err = desk.book_hall(&hall_request(hall.id, "2026-03-14", 150), now()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = desk.book_hall(&hall_request(hall.id, "2026-03-14", 0), now()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let r = desk.book_hall(&hall_request(hall.id, "2026-03-14", 80), now()).unwrap();
        assert_eq!(r.message, None);
        assert!(desk.is_hall_date_booked(hall.id, date("2026-03-14")).unwrap());

        let err = desk.book_hall(&hall_request(hall.id, "2026-03-14", 20), now()).unwrap_err();
        assert!(matches!(err, Error::SlotTaken(_)));

        let err = desk.book_hall(&hall_request(hall.id, "2026-01-18", 20), now()).unwrap_err();
        assert!(matches!(err, Error::PastSlot(_)));
    }

    #[test]
    fn test_hall_calendar() {
        let desk = desk();
        let hall = desk.add_hall("Garden Hall", 100).unwrap();
        desk.book_hall(&hall_request(hall.id, "2026-01-21", 50), now()).unwrap();
        desk.block_hall_date(hall.id, date("2026-01-22"), 1, now()).unwrap();

        let days = desk
            .hall_days(hall.id, date("2026-01-18"), 5, now(), Audience::Public)
            .unwrap();
        let states: Vec<SlotState> = days.iter().map(|d| d.state).collect();
        assert_eq!(
            states,
            vec![
                SlotState::Past,
                SlotState::Available,
                SlotState::Available,
                SlotState::Booked,
                SlotState::Booked,
            ]
        );

        assert!(desk.hall_days(hall.id, date("2026-01-18"), 0, now(), Audience::Admin).is_err());
        assert!(desk.hall_days(hall.id, date("2026-01-18"), 63, now(), Audience::Admin).is_err());
    }

    #[test]
    fn test_unblocked_hall_date_is_available() {
        let desk = desk();
        let hall = desk.add_hall("Garden Hall", 100).unwrap();
        let blocked = desk.block_hall_date(hall.id, date("2026-01-22"), 1, now()).unwrap();

        let unblocked = desk
            .set_hall_status(blocked[0].id, ReservationStatus::Canceled)
            .unwrap();
        assert_eq!(unblocked.status, ReservationStatus::Canceled);
        assert!(!desk.is_hall_date_booked(hall.id, date("2026-01-22")).unwrap());

        for audience in [Audience::Public, Audience::Admin] {
            let days = desk
                .hall_days(hall.id, date("2026-01-22"), 1, now(), audience)
                .unwrap();
            assert_eq!(days[0].state, SlotState::Available);
        }
        desk.book_hall(&hall_request(hall.id, "2026-01-22", 40), now()).unwrap();
    }

    #[test]
    fn test_hall_status_rules() {
        let desk = desk();
        let hall = desk.add_hall("Garden Hall", 100).unwrap();
        let r = desk.book_hall(&hall_request(hall.id, "2026-03-14", 80), now()).unwrap();

        let confirmed = desk.set_hall_status(r.id, ReservationStatus::Confirmed).unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
        let err = desk.set_hall_status(r.id, ReservationStatus::Pending).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        desk.set_hall_status(r.id, ReservationStatus::Canceled).unwrap();
        assert!(!desk.is_hall_date_booked(hall.id, date("2026-03-14")).unwrap());
        let err = desk.set_hall_status(r.id, ReservationStatus::Confirmed).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        // The freed date takes a new booking next to the canceled one
        desk.book_hall(&hall_request(hall.id, "2026-03-14", 20), now()).unwrap();
        let days = desk
            .hall_days(hall.id, date("2026-03-14"), 1, now(), Audience::Admin)
            .unwrap();
        assert_eq!(days[0].state, SlotState::Booked);

        let blocked = desk.block_hall_date(hall.id, date("2026-03-21"), 1, now()).unwrap();
        let err = desk
            .set_hall_status(blocked[0].id, ReservationStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let err = desk
            .set_hall_status(Uuid::new_v4(), ReservationStatus::Canceled)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_hall_reservation() {
        let desk = desk();
        let hall = desk.add_hall("Garden Hall", 100).unwrap();
        let r = desk.book_hall(&hall_request(hall.id, "2026-03-14", 80), now()).unwrap();

        let deleted = desk.delete_hall_reservation(r.id).unwrap();
        assert_eq!(deleted.id, r.id);
        assert_eq!(deleted.guest_count, 80);
        assert!(!desk.is_hall_date_booked(hall.id, date("2026-03-14")).unwrap());
        assert!(desk
            .hall_reservations(&ReservationFilter::for_resource(hall.id))
            .unwrap()
            .is_empty());
        assert!(matches!(
            desk.delete_hall_reservation(r.id).unwrap_err(),
            Error::NotFound(_)
        ));

        let log = desk.audit_log(10).unwrap();
        assert_eq!(log[0].action, AuditAction::Deleted);
        assert!(log.iter().all(|e| e.kind == ReservationKind::Hall));
    }

    #[test]
    fn test_duplicate_resource_names_rejected() {
        let desk = desk();
        desk.add_field("Field A", Some("grass".to_string())).unwrap();
        assert!(desk.add_field("Field A", None).is_err());
        assert!(desk.add_field("  ", None).is_err());

        desk.add_hall("Garden Hall", 100).unwrap();
        assert!(desk.add_hall("Garden Hall", 100).is_err());
        assert!(desk.add_hall("Roof", 0).is_err());
    }

    #[test]
    fn test_delete_and_audit_trail() {
        let desk = desk();
        let field = desk.add_field("Field A", None).unwrap();
        let r = desk.book_field(&field_request(field.id, "2026-01-20", "09:00"), now()).unwrap();
        desk.set_field_status(r.id, ReservationStatus::Confirmed).unwrap();

        let deleted = desk.delete_field_reservation(r.id).unwrap();
        assert_eq!(deleted.id, r.id);
        assert!(matches!(
            desk.delete_field_reservation(r.id).unwrap_err(),
            Error::NotFound(_)
        ));

        let log = desk.audit_log(10).unwrap();
        let actions: Vec<AuditAction> = log.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![AuditAction::Deleted, AuditAction::StatusChanged, AuditAction::Created]
        );
        assert!(log.iter().all(|e| e.reservation_id == r.id));
    }

    #[test]
    fn test_listing_filters() {
        let desk = desk();
        let a = desk.add_field("Field A", None).unwrap();
        let b = desk.add_field("Field B", None).unwrap();
        desk.book_field(&field_request(a.id, "2026-01-20", "09:00"), now()).unwrap();
        desk.book_field(&field_request(b.id, "2026-01-20", "09:00"), now()).unwrap();
        desk.book_field(&field_request(a.id, "2026-01-21", "12:00"), now()).unwrap();

        let on_a = desk.field_reservations(&ReservationFilter::for_resource(a.id)).unwrap();
        assert_eq!(on_a.len(), 2);

        let on_20 = desk
            .field_reservations(&ReservationFilter::default().on(date("2026-01-20")))
            .unwrap();
        assert_eq!(on_20.len(), 2);
    }
}
