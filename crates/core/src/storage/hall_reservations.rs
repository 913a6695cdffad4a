//! Hall reservation storage operations

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    format_date, parse_date, parse_datetime, parse_status, parse_uuid, parse_uuid_opt,
    slot_conflict, OptionalExt,
};
use crate::error::Result;
use crate::models::{Customer, HallReservation, ReservationFilter, ReservationStatus};

const COLUMNS: &str = "id, hall_id, date, customer_name, customer_phone, event_type, \
                       guest_count, message, status, recurrence_group, created_at";

fn reservation_from_row(row: &Row<'_>) -> rusqlite::Result<HallReservation> {
    Ok(HallReservation {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        hall_id: parse_uuid(&row.get::<_, String>(1)?)?,
        date: parse_date(&row.get::<_, String>(2)?)?,
        customer: Customer {
            name: row.get(3)?,
            phone: row.get(4)?,
        },
        event_type: row.get(5)?,
        guest_count: row.get(6)?,
        message: row.get(7)?,
        status: parse_status(&row.get::<_, String>(8)?)?,
        recurrence_group: parse_uuid_opt(row.get::<_, Option<String>>(9)?)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?)?,
    })
}

pub struct HallReservationStore<'a> {
    conn: &'a Connection,
}

impl<'a> HallReservationStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn insert(conn: &Connection, r: &HallReservation) -> Result<()> {
        conn.execute(
            "INSERT INTO hall_reservations
             (id, hall_id, date, customer_name, customer_phone, event_type, guest_count,
              message, status, recurrence_group, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                r.id.to_string(),
                r.hall_id.to_string(),
                format_date(r.date),
                r.customer.name,
                r.customer.phone,
                r.event_type,
                r.guest_count,
                r.message,
                r.status.as_str(),
                r.recurrence_group.map(|g| g.to_string()),
                r.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| slot_conflict(e, || format!("hall {} on {}", r.hall_id, r.date)))?;
        Ok(())
    }

    #[instrument(skip(self, r), fields(hall_id = %r.hall_id, date = %r.date))]
    pub fn create(&self, r: &HallReservation) -> Result<()> {
        Self::insert(self.conn, r)
    }

    #[instrument(skip(self, batch), fields(count = batch.len()))]
    pub fn create_batch(&self, batch: &[HallReservation]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for r in batch {
            Self::insert(&tx, r)?;
        }
        tx.commit()?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<HallReservation>> {
        let sql = format!("SELECT {} FROM hall_reservations WHERE id = ?1", COLUMNS);
        let r = self
            .conn
            .query_row(&sql, params![id.to_string()], reservation_from_row)
            .optional()?;
        Ok(r)
    }

    /// Every reservation (any status) on a hall for a date range, inclusive
    #[instrument(skip(self))]
    pub fn list_for_hall_between(
        &self,
        hall_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<HallReservation>> {
        let sql = format!(
            "SELECT {} FROM hall_reservations
             WHERE hall_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date",
            COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let list = stmt
            .query_map(
                params![hall_id.to_string(), format_date(from), format_date(to)],
                reservation_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(list)
    }

    #[instrument(skip(self))]
    pub fn list(&self, filter: &ReservationFilter) -> Result<Vec<HallReservation>> {
        let sql = format!(
            "SELECT {} FROM hall_reservations
             WHERE (?1 IS NULL OR hall_id = ?1)
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
               AND (?4 IS NULL OR status = ?4)
               AND (?5 IS NULL OR recurrence_group = ?5)
             ORDER BY date, created_at",
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

    #[instrument(skip(self))]
    pub fn update_status(&self, id: Uuid, status: ReservationStatus) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE hall_reservations SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id.to_string()],
            )
            .map_err(|e| slot_conflict(e, || format!("reservation {}", id)))?;
        Ok(changed > 0)
    }

    #[instrument(skip(self))]
    pub fn cancel_group(&self, group_id: Uuid) -> Result<Vec<(Uuid, ReservationStatus)>> {
        let tx = self.conn.unchecked_transaction()?;
        let held = {
            let mut stmt = tx.prepare(
                "SELECT id, status FROM hall_reservations
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
            "UPDATE hall_reservations SET status = 'canceled'
             WHERE recurrence_group = ?1 AND status != 'canceled'",
            params![group_id.to_string()],
        )?;
        tx.commit()?;
        Ok(held)
    }

    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM hall_reservations WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::EventHall;
    use crate::storage::Database;

    fn setup() -> (Database, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let hall = EventHall::new("Garden Hall".to_string(), 150);
        db.halls().create(&hall).unwrap();
        (db, hall.id)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn wedding(hall_id: Uuid, date: NaiveDate) -> HallReservation {
        HallReservation::new(
            hall_id,
            date,
            Customer::new("Lina", "+21655555555"),
            "wedding".to_string(),
            120,
        )
        .with_message("Evening reception".to_string())
    }

    #[test]
    fn test_create_and_find() {
        let (db, hall_id) = setup();
        let r = wedding(hall_id, day(14));
        db.hall_reservations().create(&r).unwrap();

        let found = db.hall_reservations().find_by_id(r.id).unwrap().unwrap();
        assert_eq!(found.date, day(14));
        assert_eq!(found.event_type, "wedding");
        assert_eq!(found.guest_count, 120);
        assert_eq!(found.status, ReservationStatus::Pending);
        assert_eq!(found.message.as_deref(), Some("Evening reception"));
    }

    #[test]
    fn test_one_active_reservation_per_day() {
        let (db, hall_id) = setup();
        let first = wedding(hall_id, day(14));
        db.hall_reservations().create(&first).unwrap();

        let err = db
            .hall_reservations()
            .create(&HallReservation::blocked(hall_id, day(14)))
            .unwrap_err();
        assert!(matches!(err, Error::SlotTaken(_)));

        db.hall_reservations()
            .update_status(first.id, ReservationStatus::Canceled)
            .unwrap();
        db.hall_reservations()
            .create(&HallReservation::blocked(hall_id, day(14)))
            .unwrap();
    }

    #[test]
    fn test_list_between() {
        let (db, hall_id) = setup();
        for d in [10, 14, 20] {
            db.hall_reservations().create(&wedding(hall_id, day(d))).unwrap();
        }

        let list = db
            .hall_reservations()
            .list_for_hall_between(hall_id, day(11), day(20))
            .unwrap();
        let dates: Vec<NaiveDate> = list.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(14), day(20)]);
    }

    #[test]
    fn test_cancel_group() {
        let (db, hall_id) = setup();
        let group = Uuid::new_v4();
        let batch: Vec<_> = [day(7), day(14)]
            .into_iter()
            .map(|d| HallReservation::blocked(hall_id, d).in_group(group))
            .collect();
        db.hall_reservations().create_batch(&batch).unwrap();

        assert_eq!(db.hall_reservations().cancel_group(group).unwrap().len(), 2);
        let canceled =
            ReservationFilter::for_resource(hall_id).with_status(ReservationStatus::Canceled);
        assert_eq!(db.hall_reservations().list(&canceled).unwrap().len(), 2);
    }
}
