//! Event hall storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::EventHall;

const HALL_COLUMNS: &str = "id, name, capacity, is_active, created_at";

fn hall_from_row(row: &Row<'_>) -> rusqlite::Result<EventHall> {
    Ok(EventHall {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        capacity: row.get(2)?,
        is_active: row.get::<_, i32>(3)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}

pub struct HallStore<'a> {
    conn: &'a Connection,
}

impl<'a> HallStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new hall
    #[instrument(skip(self, hall), fields(hall_name = %hall.name))]
    pub fn create(&self, hall: &EventHall) -> Result<()> {
        self.conn.execute(
            "INSERT INTO halls (id, name, capacity, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                hall.id.to_string(),
                hall.name,
                hall.capacity,
                hall.is_active as i32,
                hall.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find hall by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<EventHall>> {
        let sql = format!("SELECT {} FROM halls WHERE id = ?1", HALL_COLUMNS);
        let hall = self
            .conn
            .query_row(&sql, params![id.to_string()], hall_from_row)
            .optional()?;
        Ok(hall)
    }

    #[instrument(skip(self))]
    pub fn find_by_name(&self, name: &str) -> Result<Option<EventHall>> {
        let sql = format!("SELECT {} FROM halls WHERE name = ?1", HALL_COLUMNS);
        let hall = self
            .conn
            .query_row(&sql, params![name], hall_from_row)
            .optional()?;
        Ok(hall)
    }

    #[instrument(skip(self))]
    pub fn list(&self, include_inactive: bool) -> Result<Vec<EventHall>> {
        let sql = format!(
            "SELECT {} FROM halls WHERE is_active = 1 OR ?1 ORDER BY name",
            HALL_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let halls = stmt
            .query_map(params![include_inactive], hall_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(halls)
    }

    #[instrument(skip(self))]
    pub fn set_active(&self, id: Uuid, is_active: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE halls SET is_active = ?1 WHERE id = ?2",
            params![is_active as i32, id.to_string()],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    #[test]
    fn test_create_and_list() {
        let db = Database::open_in_memory().unwrap();
        let hall = EventHall::new("Garden Hall".to_string(), 150);
        db.halls().create(&hall).unwrap();

        let found = db.halls().find_by_id(hall.id).unwrap().unwrap();
        assert_eq!(found.capacity, 150);
        assert_eq!(db.halls().find_by_name("Garden Hall").unwrap().unwrap().id, hall.id);

        db.halls().set_active(hall.id, false).unwrap();
        assert!(db.halls().list(false).unwrap().is_empty());
        assert_eq!(db.halls().list(true).unwrap().len(), 1);
    }
}
