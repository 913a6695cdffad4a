//! SQLite storage layer for Venue

mod audit;
mod field_reservations;
mod fields;
mod hall_reservations;
mod halls;
mod migrations;
mod parse;
mod traits;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AuditEntry, EventHall, Field, FieldReservation, HallReservation, ReservationFilter,
    ReservationStatus,
};
use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

pub use audit::AuditStore;
pub use field_reservations::FieldReservationStore;
pub use fields::FieldStore;
pub use hall_reservations::HallReservationStore;
pub use halls::HallStore;
pub use traits::{AuditRepository, ReservationRepository, ResourceRepository, Storage};

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    pub fn fields(&self) -> FieldStore<'_> {
        FieldStore::new(&self.conn)
    }

    pub fn halls(&self) -> HallStore<'_> {
        HallStore::new(&self.conn)
    }

    pub fn field_reservations(&self) -> FieldReservationStore<'_> {
        FieldReservationStore::new(&self.conn)
    }

    pub fn hall_reservations(&self) -> HallReservationStore<'_> {
        HallReservationStore::new(&self.conn)
    }

    pub fn audit(&self) -> AuditStore<'_> {
        AuditStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl ResourceRepository for Database {
    fn create_field(&self, field: &Field) -> Result<()> {
        self.fields().create(field)
    }

    fn find_field(&self, id: Uuid) -> Result<Option<Field>> {
        self.fields().find_by_id(id)
    }

    fn find_field_by_name(&self, name: &str) -> Result<Option<Field>> {
        self.fields().find_by_name(name)
    }

    fn list_fields(&self, include_inactive: bool) -> Result<Vec<Field>> {
        self.fields().list(include_inactive)
    }

    fn set_field_active(&self, id: Uuid, is_active: bool) -> Result<bool> {
        self.fields().set_active(id, is_active)
    }

    fn create_hall(&self, hall: &EventHall) -> Result<()> {
        self.halls().create(hall)
    }

    fn find_hall(&self, id: Uuid) -> Result<Option<EventHall>> {
        self.halls().find_by_id(id)
    }

    fn find_hall_by_name(&self, name: &str) -> Result<Option<EventHall>> {
        self.halls().find_by_name(name)
    }

    fn list_halls(&self, include_inactive: bool) -> Result<Vec<EventHall>> {
        self.halls().list(include_inactive)
    }

    fn set_hall_active(&self, id: Uuid, is_active: bool) -> Result<bool> {
        self.halls().set_active(id, is_active)
    }
}

impl ReservationRepository for Database {
    fn create_field_reservation(&self, r: &FieldReservation) -> Result<()> {
        self.field_reservations().create(r)
    }

    fn create_field_reservations(&self, batch: &[FieldReservation]) -> Result<()> {
        self.field_reservations().create_batch(batch)
    }

    fn find_field_reservation(&self, id: Uuid) -> Result<Option<FieldReservation>> {
        self.field_reservations().find_by_id(id)
    }

    fn field_reservations_on(
        &self,
        field_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<FieldReservation>> {
        self.field_reservations().list_for_field_on(field_id, date)
    }

    fn list_field_reservations(&self, filter: &ReservationFilter) -> Result<Vec<FieldReservation>> {
        self.field_reservations().list(filter)
    }

    fn update_field_reservation_status(&self, id: Uuid, status: ReservationStatus) -> Result<bool> {
        self.field_reservations().update_status(id, status)
    }

    fn cancel_field_group(&self, group_id: Uuid) -> Result<Vec<(Uuid, ReservationStatus)>> {
        self.field_reservations().cancel_group(group_id)
    }

    fn delete_field_reservation(&self, id: Uuid) -> Result<bool> {
        self.field_reservations().delete(id)
    }

    fn create_hall_reservation(&self, r: &HallReservation) -> Result<()> {
        self.hall_reservations().create(r)
    }

    fn create_hall_reservations(&self, batch: &[HallReservation]) -> Result<()> {
        self.hall_reservations().create_batch(batch)
    }

    fn find_hall_reservation(&self, id: Uuid) -> Result<Option<HallReservation>> {
        self.hall_reservations().find_by_id(id)
    }

    fn hall_reservations_between(
        &self,
        hall_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HallReservation>> {
        self.hall_reservations().list_for_hall_between(hall_id, from, to)
    }

    fn list_hall_reservations(&self, filter: &ReservationFilter) -> Result<Vec<HallReservation>> {
        self.hall_reservations().list(filter)
    }

    fn update_hall_reservation_status(&self, id: Uuid, status: ReservationStatus) -> Result<bool> {
        self.hall_reservations().update_status(id, status)
    }

    fn cancel_hall_group(&self, group_id: Uuid) -> Result<Vec<(Uuid, ReservationStatus)>> {
        self.hall_reservations().cancel_group(group_id)
    }

    fn delete_hall_reservation(&self, id: Uuid) -> Result<bool> {
        self.hall_reservations().delete(id)
    }
}

impl AuditRepository for Database {
    fn record_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.audit().record(entry)
    }

    fn recent_audit(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        self.audit().recent(limit)
    }
}
