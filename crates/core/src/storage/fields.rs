//! Field storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::Field;

const FIELD_COLUMNS: &str = "id, name, surface, is_active, created_at";

fn field_from_row(row: &Row<'_>) -> rusqlite::Result<Field> {
    Ok(Field {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        surface: row.get(2)?,
        is_active: row.get::<_, i32>(3)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(4)?)?,
    })
}

pub struct FieldStore<'a> {
    conn: &'a Connection,
}

impl<'a> FieldStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new field
    #[instrument(skip(self, field), fields(field_name = %field.name))]
    pub fn create(&self, field: &Field) -> Result<()> {
        self.conn.execute(
            "INSERT INTO fields (id, name, surface, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                field.id.to_string(),
                field.name,
                field.surface,
                field.is_active as i32,
                field.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find field by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Field>> {
        let sql = format!("SELECT {} FROM fields WHERE id = ?1", FIELD_COLUMNS);
        let field = self
            .conn
            .query_row(&sql, params![id.to_string()], field_from_row)
            .optional()?;
        Ok(field)
    }

    /// Find field by exact name
    #[instrument(skip(self))]
    pub fn find_by_name(&self, name: &str) -> Result<Option<Field>> {
        let sql = format!("SELECT {} FROM fields WHERE name = ?1", FIELD_COLUMNS);
        let field = self
            .conn
            .query_row(&sql, params![name], field_from_row)
            .optional()?;
        Ok(field)
    }

    /// List fields by name, optionally including inactive ones
    #[instrument(skip(self))]
    pub fn list(&self, include_inactive: bool) -> Result<Vec<Field>> {
        let sql = format!(
            "SELECT {} FROM fields WHERE is_active = 1 OR ?1 ORDER BY name",
            FIELD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let fields = stmt
            .query_map(params![include_inactive], field_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(fields)
    }

    /// Activate or retire a field. Returns false if no such field.
    #[instrument(skip(self))]
    pub fn set_active(&self, id: Uuid, is_active: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE fields SET is_active = ?1 WHERE id = ?2",
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
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let field = Field::new("Field A".to_string()).with_surface("synthetic".to_string());
        db.fields().create(&field).unwrap();

        let found = db.fields().find_by_id(field.id).unwrap().unwrap();
        assert_eq!(found.name, "Field A");
        assert_eq!(found.surface.as_deref(), Some("synthetic"));
        assert!(found.is_active);

        assert!(db.fields().find_by_name("Field A").unwrap().is_some());
        assert!(db.fields().find_by_id(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.fields().create(&Field::new("Field A".to_string())).unwrap();
        assert!(db.fields().create(&Field::new("Field A".to_string())).is_err());
    }

    #[test]
    fn test_list_hides_inactive() {
        let db = Database::open_in_memory().unwrap();
        let a = Field::new("Field A".to_string());
        let b = Field::new("Field B".to_string());
        db.fields().create(&a).unwrap();
        db.fields().create(&b).unwrap();

        assert!(db.fields().set_active(b.id, false).unwrap());
        assert!(!db.fields().set_active(Uuid::new_v4(), false).unwrap());

        let active = db.fields().list(false).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);
        assert_eq!(db.fields().list(true).unwrap().len(), 2);
    }
}
