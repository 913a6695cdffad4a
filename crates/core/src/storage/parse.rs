//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::error::Error;
use crate::models::{AuditAction, ReservationKind, ReservationStatus, TimeSlot};

/// Stored date format; sorts lexically
pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn conversion_failure(
    e: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> SqlError {
    SqlError::FromSqlConversionFailure(0, Type::Text, e.into())
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(conversion_failure)
}

/// Parse an optional UUID from a database string column
pub fn parse_uuid_opt(s: Option<String>) -> Result<Option<Uuid>, SqlError> {
    s.map(|s| parse_uuid(&s)).transpose()
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_failure)
}

/// Parse a stored `yyyy-MM-dd` date
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(conversion_failure)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_slot(s: &str) -> Result<TimeSlot, SqlError> {
    s.parse::<TimeSlot>()
        .map_err(|e: Error| conversion_failure(e.to_string()))
}

pub fn parse_status(s: &str) -> Result<ReservationStatus, SqlError> {
    s.parse::<ReservationStatus>()
        .map_err(|e: Error| conversion_failure(e.to_string()))
}

pub fn parse_status_opt(s: Option<String>) -> Result<Option<ReservationStatus>, SqlError> {
    s.map(|s| parse_status(&s)).transpose()
}

pub fn parse_kind(s: &str) -> Result<ReservationKind, SqlError> {
    s.parse::<ReservationKind>()
        .map_err(|e: Error| conversion_failure(e.to_string()))
}

pub fn parse_action(s: &str) -> Result<AuditAction, SqlError> {
    s.parse::<AuditAction>()
        .map_err(|e: Error| conversion_failure(e.to_string()))
}

/// Map a unique-index violation to `SlotTaken`, anything else to `Database`
pub fn slot_conflict(err: SqlError, what: impl FnOnce() -> String) -> Error {
    match &err {
        SqlError::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::SlotTaken(what())
        }
        _ => Error::Database(err),
    }
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
