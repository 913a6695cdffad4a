//! Reservation models and status rules

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TimeSlot;
use crate::error::Error;

/// Customer name written on admin-created sentinel records
pub const BLOCKED_CUSTOMER_NAME: &str = "BLOCKED";

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Submitted by a customer, awaiting admin review
    Pending,
    Confirmed,
    Canceled,
    /// Admin placeholder marking a date or slot unavailable
    Blocked,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Canceled => "canceled",
            ReservationStatus::Blocked => "blocked",
        }
    }

    /// Does a reservation in this status hold its slot?
    pub fn holds_slot(&self) -> bool {
        *self != ReservationStatus::Canceled
    }

    /// Allowed admin transitions. Same-status is handled by the caller as a no-op.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Canceled) | (Confirmed, Canceled) | (Blocked, Canceled)
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            // Both spellings show up in older records
            "canceled" | "cancelled" => Ok(ReservationStatus::Canceled),
            "blocked" => Ok(ReservationStatus::Blocked),
            other => Err(Error::Validation(format!("Unknown status '{}'", other))),
        }
    }
}

/// Which kind of resource a reservation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationKind {
    Field,
    Hall,
}

impl ReservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationKind::Field => "field",
            ReservationKind::Hall => "hall",
        }
    }
}

impl fmt::Display for ReservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "field" => Ok(ReservationKind::Field),
            "hall" => Ok(ReservationKind::Hall),
            other => Err(Error::Validation(format!("Unknown reservation kind '{}'", other))),
        }
    }
}

/// Contact details taken from the booking form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
}

impl Customer {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
        }
    }

    /// Placeholder customer for blocked records
    pub fn blocked() -> Self {
        Self {
            name: BLOCKED_CUSTOMER_NAME.to_string(),
            phone: String::new(),
        }
    }
}

/// A field booking for one slot on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReservation {
    pub id: Uuid,
    pub field_id: Uuid,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub customer: Customer,
    pub status: ReservationStatus,
    /// Shared by weekly occurrences created together
    pub recurrence_group: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl FieldReservation {
    pub fn new(field_id: Uuid, date: NaiveDate, slot: TimeSlot, customer: Customer) -> Self {
        Self {
            id: Uuid::new_v4(),
            field_id,
            date,
            slot,
            customer,
            status: ReservationStatus::Pending,
            recurrence_group: None,
            created_at: Utc::now(),
        }
    }

    pub fn blocked(field_id: Uuid, date: NaiveDate, slot: TimeSlot) -> Self {
        Self {
            status: ReservationStatus::Blocked,
            ..Self::new(field_id, date, slot, Customer::blocked())
        }
    }

    pub fn in_group(mut self, group_id: Uuid) -> Self {
        self.recurrence_group = Some(group_id);
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.status == ReservationStatus::Blocked
    }
}

/// An event hall booking for a whole day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HallReservation {
    pub id: Uuid,
    pub hall_id: Uuid,
    pub date: NaiveDate,
    pub customer: Customer,
    /// Birthday, wedding, corporate... free text from the form
    pub event_type: String,
    pub guest_count: u32,
    pub message: Option<String>,
    pub status: ReservationStatus,
    pub recurrence_group: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl HallReservation {
    pub fn new(
        hall_id: Uuid,
        date: NaiveDate,
        customer: Customer,
        event_type: String,
        guest_count: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            hall_id,
            date,
            customer,
            event_type,
            guest_count,
            message: None,
            status: ReservationStatus::Pending,
            recurrence_group: None,
            created_at: Utc::now(),
        }
    }

    pub fn blocked(hall_id: Uuid, date: NaiveDate) -> Self {
        Self {
            status: ReservationStatus::Blocked,
            ..Self::new(hall_id, date, Customer::blocked(), "blocked".to_string(), 0)
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }

    pub fn in_group(mut self, group_id: Uuid) -> Self {
        self.recurrence_group = Some(group_id);
        self
    }

    pub fn is_blocked(&self) -> bool {
        self.status == ReservationStatus::Blocked
    }
}

/// Listing filter for admin views; `None` matches anything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationFilter {
    /// Field or hall id, depending on the list being filtered
    pub resource_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<ReservationStatus>,
    pub recurrence_group: Option<Uuid>,
}

impl ReservationFilter {
    pub fn for_resource(resource_id: Uuid) -> Self {
        Self {
            resource_id: Some(resource_id),
            ..Self::default()
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.from = Some(date);
        self.to = Some(date);
        self
    }

    pub fn with_status(mut self, status: ReservationStatus) -> Self {
        self.status = Some(status);
        self
    }
}
