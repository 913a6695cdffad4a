//! Audit trail entries for reservation changes

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ReservationKind, ReservationStatus};
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    StatusChanged,
    Deleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "created",
            AuditAction::StatusChanged => "status_changed",
            AuditAction::Deleted => "deleted",
        }
    }
}

impl FromStr for AuditAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(AuditAction::Created),
            "status_changed" => Ok(AuditAction::StatusChanged),
            "deleted" => Ok(AuditAction::Deleted),
            other => Err(Error::Validation(format!("Unknown audit action '{}'", other))),
        }
    }
}

/// One recorded change to a reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub kind: ReservationKind,
    pub reservation_id: Uuid,
    pub action: AuditAction,
    pub from_status: Option<ReservationStatus>,
    pub to_status: Option<ReservationStatus>,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        kind: ReservationKind,
        reservation_id: Uuid,
        action: AuditAction,
        from_status: Option<ReservationStatus>,
        to_status: Option<ReservationStatus>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            reservation_id,
            action,
            from_status,
            to_status,
            at: Utc::now(),
        }
    }
}
