//! Storage repository traits
//!
//! These traits define the storage interface the booking desk runs
//! against, allowing for different implementations (SQLite, mock).

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AuditEntry, EventHall, Field, FieldReservation, HallReservation, ReservationFilter,
    ReservationStatus,
};

/// Field and hall catalogue
pub trait ResourceRepository {
    fn create_field(&self, field: &Field) -> Result<()>;

    fn find_field(&self, id: Uuid) -> Result<Option<Field>>;

    fn find_field_by_name(&self, name: &str) -> Result<Option<Field>>;

    fn list_fields(&self, include_inactive: bool) -> Result<Vec<Field>>;

    /// Returns false if the field does not exist
    fn set_field_active(&self, id: Uuid, is_active: bool) -> Result<bool>;

    fn create_hall(&self, hall: &EventHall) -> Result<()>;

    fn find_hall(&self, id: Uuid) -> Result<Option<EventHall>>;

    fn find_hall_by_name(&self, name: &str) -> Result<Option<EventHall>>;

    fn list_halls(&self, include_inactive: bool) -> Result<Vec<EventHall>>;

    fn set_hall_active(&self, id: Uuid, is_active: bool) -> Result<bool>;
}

/// Reservation operations
///
/// Implementations must reject a second non-canceled reservation for the
/// same (field, date, slot) or (hall, date) with `Error::SlotTaken`.
pub trait ReservationRepository {
    fn create_field_reservation(&self, r: &FieldReservation) -> Result<()>;

    /// All or nothing
    fn create_field_reservations(&self, batch: &[FieldReservation]) -> Result<()>;

    fn find_field_reservation(&self, id: Uuid) -> Result<Option<FieldReservation>>;

    /// Every reservation on a field for one day, any status
    fn field_reservations_on(
        &self,
        field_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<FieldReservation>>;

    fn list_field_reservations(&self, filter: &ReservationFilter) -> Result<Vec<FieldReservation>>;

    fn update_field_reservation_status(&self, id: Uuid, status: ReservationStatus) -> Result<bool>;

    /// Cancel held reservations in a group; returns (id, previous status)
    fn cancel_field_group(&self, group_id: Uuid) -> Result<Vec<(Uuid, ReservationStatus)>>;

    fn delete_field_reservation(&self, id: Uuid) -> Result<bool>;

    fn create_hall_reservation(&self, r: &HallReservation) -> Result<()>;

    fn create_hall_reservations(&self, batch: &[HallReservation]) -> Result<()>;

    fn find_hall_reservation(&self, id: Uuid) -> Result<Option<HallReservation>>;

    /// Every reservation on a hall between two dates (inclusive), any status
    fn hall_reservations_between(
        &self,
        hall_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HallReservation>>;

    fn list_hall_reservations(&self, filter: &ReservationFilter) -> Result<Vec<HallReservation>>;

    fn update_hall_reservation_status(&self, id: Uuid, status: ReservationStatus) -> Result<bool>;

    fn cancel_hall_group(&self, group_id: Uuid) -> Result<Vec<(Uuid, ReservationStatus)>>;

    fn delete_hall_reservation(&self, id: Uuid) -> Result<bool>;
}

/// Audit trail
pub trait AuditRepository {
    fn record_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// Newest first
    fn recent_audit(&self, limit: u32) -> Result<Vec<AuditEntry>>;
}

/// Combined storage interface
pub trait Storage: ResourceRepository + ReservationRepository + AuditRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: ResourceRepository + ReservationRepository + AuditRepository {}
