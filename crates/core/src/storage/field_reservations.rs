//! Field reservation storage operations

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    format_date, parse_date, parse_datetime, parse_slot, parse_status, parse_uuid,
    parse_uuid_opt, slot_conflict, OptionalExt,
};
use crate::error::Result;
use crate::models::{Customer, FieldReservation, ReservationFilter, ReservationStatus};

const COLUMNS: &str = "id, field_id, date, slot, customer_name, customer_phone, status, \
                       recurrence_group, created_at";

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<FieldReservation> {
    Ok(FieldReservation {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        field_id: parse_uuid(&row.get::<_, String>(1)?)?,
        date: parse_date(&row.get::<_, String>(2)?)?,
        slot: parse_slot(&row.get::<_, String>(3)?)?,
        customer: Customer {
            name: row.get(4)?,
            phone: row.get(5)?,
        },
        status: parse_status(&row.get::<_, String>(6)?)?,
        recurrence_group: parse_uuid_opt(row.get::<_, Option<String>>(7)?)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?)?,
    })
}

fn describe(r: &FieldReservation) -> String {
    format!("field {} on {} at {}", r.field_id, r.date, r.slot)
}

pub struct FieldReservationStore<'a> {
    conn: &'a Connection,
}

impl<'a> FieldReservationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn insert(conn: &Connection, r: &FieldReservation) -> Result<()> {
        conn.execute(
            "INSERT INTO field_reservations
             (id, field_id, date, slot, customer_name, customer_phone, status,
              recurrence_group, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                r.id.to_string(),
                r.field_id.to_string(),
                format_date(r.date),
                r.slot.to_string(),
                r.customer.name,
                r.customer.phone,
                r.status.as_str(),
                r.recurrence_group.map(|g| g.to_string()),
                r.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| slot_conflict(e, || describe(r)))?;
        Ok(())
    }

    /// Insert one reservation; a held slot yields `SlotTaken`
    #[instrument(skip(self, r), fields(field_id = %r.field_id, date = %r.date, slot = %r.slot))]
    pub fn create(&self, r: &FieldReservation) -> Result<()> {
        Self::insert(self.conn, r)
    }

    /// Insert several reservations atomically; nothing is written on conflict
    #[instrument(skip(self, batch), fields(count = batch.len()))]
    pub fn create_batch(&self, batch: &[FieldReservation]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for r in batch {
            Self::insert(&tx, r)?;
        }
        tx.commit()?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<FieldReservation>> {
        let sql = format!("SELECT {} FROM field_reservations WHERE id = ?1", COLUMNS);
        let r = self
            .conn
            .query_row(&sql, params![id.to_string()], reservation_from_row)
            .optional()?;
        Ok(r)
    }

    /// Every reservation (any status) on a field for one day
    #[instrument(skip(self))]
    pub fn list_for_field_on(
        &self,
        field_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<FieldReservation>> {
        let sql = format!(
            "SELECT {} FROM field_reservations WHERE field_id = ?1 AND date = ?2 ORDER BY slot",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let list = stmt
            .query_map(params![field_id.to_string(), format_date(date)], reservation_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(list)
    }

    /// Filtered listing ordered by date, slot
    #[instrument(skip(self))]
    pub fn list(&self, filter: &ReservationFilter) -> Result<Vec<FieldReservation>> {
        let sql = format!(
            "SELECT {} FROM field_reservations
             WHERE (?1 IS NULL OR field_id = ?1)
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
               AND (?4 IS NULL OR status = ?4)
               AND (?5 IS NULL OR recurrence_group = ?5)
             ORDER BY date, slot, created_at",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let list = stmt
            .query_map(
                params![
                    filter.resource_id.map(|id| id.to_string()),
                    filter.from.map(format_date),
                    filter.to.map(format_date),
                    filter.status.map(|s| s.as_str()),
                    filter.recurrence_group.map(|g| g.to_string()),
                ],
                reservation_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(list)
    }

    /// Set status. Returns false if no such reservation.
    #[instrument(skip(self))]
    pub fn update_status(&self, id: Uuid, status: ReservationStatus) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE field_reservations SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.to_string()],
            )
            .map_err(|e| slot_conflict(e, || format!("reservation {}", id)))?;
        Ok(changed > 0)
    }

    /// Cancel every held reservation in a recurrence group.
    /// Returns the (id, previous status) of each one changed.
    #[instrument(skip(self))]
    pub fn cancel_group(&self, group_id: Uuid) -> Result<Vec<(Uuid, ReservationStatus)>> {
        let tx = self.conn.unchecked_transaction()?;
        let held = {
            let mut stmt = tx.prepare(
                "SELECT id, status FROM field_reservations
                 WHERE recurrence_group = ?1 AND status != 'canceled'",
            )?;
            let rows = stmt
                .query_map(params![group_id.to_string()], |row| {
                    Ok((
                        parse_uuid(&row.get::<_, String>(0)?)?,
                        parse_status(&row.get::<_, String>(1)?)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        tx.execute(
            "UPDATE field_reservations SET status = 'canceled'
             WHERE recurrence_group = ?1 AND status != 'canceled'",
            params![group_id.to_string()],
        )?;
        tx.commit()?;
        Ok(held)
    }

    /// Hard delete. Returns false if no such reservation.
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM field_reservations WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }
}
