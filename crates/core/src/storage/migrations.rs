//! Database migration system
//!
//! Tracks schema versions and applies migrations in order.

use rusqlite::Connection;
use tracing::{info, instrument};

use crate::error::Result;

/// A database migration
pub struct Migration {
    /// Version number (must be sequential starting from 1)
    pub version: u32,
    /// Description of what this migration does
    pub description: &'static str,
    /// SQL to run for this migration
    pub sql: &'static str,
}

/// All migrations in order
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema",
        sql: r#"
            -- Sports fields (booked per slot)
            CREATE TABLE IF NOT EXISTS fields (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                surface TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Event halls (booked per day)
            CREATE TABLE IF NOT EXISTS halls (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                capacity INTEGER NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            -- Field reservations; date is yyyy-MM-dd, slot is HH:MM
            CREATE TABLE IF NOT EXISTS field_reservations (
                id TEXT PRIMARY KEY,
                field_id TEXT NOT NULL,
                date TEXT NOT NULL,
                slot TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                customer_phone TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                recurrence_group TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (field_id) REFERENCES fields(id) ON DELETE CASCADE
            );

            -- Hall reservations
            CREATE TABLE IF NOT EXISTS hall_reservations (
                id TEXT PRIMARY KEY,
                hall_id TEXT NOT NULL,
                date TEXT NOT NULL,
                customer_name TEXT NOT NULL,
                customer_phone TEXT NOT NULL,
                event_type TEXT NOT NULL,
                guest_count INTEGER NOT NULL,
                message TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                recurrence_group TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (hall_id) REFERENCES halls(id) ON DELETE CASCADE
            );
        "#,
    },
    Migration {
        version: 2,
        description: "Enforce one active reservation per slot and add lookup indexes",
        sql: r#"
            -- At most one non-canceled reservation per (field, date, slot)
            CREATE UNIQUE INDEX IF NOT EXISTS idx_field_res_active_slot
                ON field_reservations(field_id, date, slot)
                WHERE status != 'canceled';

            -- At most one non-canceled reservation per (hall, date)
            CREATE UNIQUE INDEX IF NOT EXISTS idx_hall_res_active_date
                ON hall_reservations(hall_id, date)
                WHERE status != 'canceled';

            CREATE INDEX IF NOT EXISTS idx_field_res_field_date
                ON field_reservations(field_id, date);
            CREATE INDEX IF NOT EXISTS idx_field_res_date ON field_reservations(date);
            CREATE INDEX IF NOT EXISTS idx_field_res_group ON field_reservations(recurrence_group);

            CREATE INDEX IF NOT EXISTS idx_hall_res_hall_date
                ON hall_reservations(hall_id, date);
            CREATE INDEX IF NOT EXISTS idx_hall_res_date ON hall_reservations(date);
            CREATE INDEX IF NOT EXISTS idx_hall_res_group ON hall_reservations(recurrence_group);
        "#,
    },
    Migration {
        version: 3,
        description: "Add audit log for reservation changes",
        sql: r#"
            -- No foreign key: entries outlive deleted reservations
            CREATE TABLE IF NOT EXISTS audit_log (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                reservation_id TEXT NOT NULL,
                action TEXT NOT NULL,
                from_status TEXT,
                to_status TEXT,
                at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_at ON audit_log(at);
            CREATE INDEX IF NOT EXISTS idx_audit_log_reservation ON audit_log(reservation_id);
        "#,
    },
];

/// Initialize the migrations table
fn init_migrations_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version
fn get_current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .unwrap_or(None);
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            migration.version,
            migration.description,
            chrono::Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

/// Run all pending migrations
#[instrument(skip(conn))]
pub fn run_migrations(conn: &Connection) -> Result<()> {
    init_migrations_table(conn)?;

    let current_version = get_current_version(conn)?;
    info!(current_version, "Checking for pending migrations");

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                description = migration.description,
                "Applying migration"
            );

            conn.execute_batch(migration.sql)?;
            record_migration(conn, migration)?;

            info!(version = migration.version, "Migration complete");
        }
    }

    let new_version = get_current_version(conn)?;
    if new_version > current_version {
        info!(
            from = current_version,
            to = new_version,
            "Database schema updated"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn latest_version() -> u32 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_current_version(&conn).unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_migrations_sequential() {
        for (i, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(
                migration.version as usize,
                i + 1,
                "Migration {} should have version {}",
                migration.description,
                i + 1
            );
        }
    }

    #[test]
    fn test_active_slot_index_ignores_canceled() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO fields (id, name, created_at)
             VALUES ('f1', 'Field A', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let insert = |id: &str, status: &str| {
            conn.execute(
                "INSERT INTO field_reservations
                 (id, field_id, date, slot, customer_name, customer_phone, status, created_at)
                 VALUES (?1, 'f1', '2026-01-20', '09:00', 'x', 'y', ?2, '2026-01-01T00:00:00Z')",
                rusqlite::params![id, status],
            )
        };

        insert("r1", "canceled").unwrap();
        insert("r2", "canceled").unwrap();
        insert("r3", "confirmed").unwrap();
        assert!(insert("r4", "pending").is_err());
    }
}
