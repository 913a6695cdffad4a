//! Audit log storage

use rusqlite::{params, Connection};
use tracing::instrument;

use super::parse::{parse_action, parse_datetime, parse_kind, parse_status_opt, parse_uuid};
use crate::error::Result;
use crate::models::AuditEntry;

pub struct AuditStore<'a> {
    conn: &'a Connection,
}

impl<'a> AuditStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    #[instrument(
        skip(self, entry),
        fields(
            kind = %entry.kind,
            reservation_id = %entry.reservation_id,
            action = entry.action.as_str()
        )
    )]
    pub fn record(&self, entry: &AuditEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO audit_log (id, kind, reservation_id, action, from_status, to_status, at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.to_string(),
                entry.kind.as_str(),
                entry.reservation_id.to_string(),
                entry.action.as_str(),
                entry.from_status.map(|s| s.as_str()),
                entry.to_status.map(|s| s.as_str()),
                entry.at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent entries first
    #[instrument(skip(self))]
    pub fn recent(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, reservation_id, action, from_status, to_status, at
             FROM audit_log ORDER BY at DESC, rowid DESC LIMIT ?1",
        )?;

        let entries = stmt
            .query_map(params![limit], |row| {
                Ok(AuditEntry {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    kind: parse_kind(&row.get::<_, String>(1)?)?,
                    reservation_id: parse_uuid(&row.get::<_, String>(2)?)?,
                    action: parse_action(&row.get::<_, String>(3)?)?,
                    from_status: parse_status_opt(row.get::<_, Option<String>>(4)?)?,
                    to_status: parse_status_opt(row.get::<_, Option<String>>(5)?)?,
                    at: parse_datetime(&row.get::<_, String>(6)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditAction, ReservationKind, ReservationStatus};
    use crate::storage::Database;
    use uuid::Uuid;

    #[test]
    fn test_record_and_read_back() {
        let db = Database::open_in_memory().unwrap();
        let reservation_id = Uuid::new_v4();

        db.audit()
            .record(&AuditEntry::new(
                ReservationKind::Field,
                reservation_id,
                AuditAction::Created,
                None,
                Some(ReservationStatus::Pending),
            ))
            .unwrap();
        db.audit()
            .record(&AuditEntry::new(
                ReservationKind::Field,
                reservation_id,
                AuditAction::StatusChanged,
                Some(ReservationStatus::Pending),
                Some(ReservationStatus::Confirmed),
            ))
            .unwrap();

        let entries = db.audit().recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::StatusChanged);
        assert_eq!(entries[0].to_status, Some(ReservationStatus::Confirmed));
        assert_eq!(entries[1].action, AuditAction::Created);
        assert_eq!(entries[1].from_status, None);

        assert_eq!(db.audit().recent(1).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_action_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO audit_log (id, kind, reservation_id, action, at)
                 VALUES (?1, 'field', ?2, 'renamed', '2026-01-20T09:00:00Z')",
                params![Uuid::new_v4().to_string(), Uuid::new_v4().to_string()],
            )
            .unwrap();

        assert!(db.audit().recent(10).is_err());
    }
}
