//! Network protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use venue_core::{
    AuditEntry, Customer, DateAvailability, EventHall, Field, FieldReservation, HallReservation,
    ReservationFilter, ReservationStatus, SlotAvailability, TimeSlot,
};

fn one_week() -> u32 {
    1
}

fn default_audit_limit() -> u32 {
    100
}

/// Network protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// First frame from a client. A token unlocks admin operations.
    Hello {
        client: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        admin_token: Option<String>,
    },

    /// Server accepts the session
    Welcome { session_id: Uuid, admin: bool },

    /// Server refuses the session (or a subscription)
    Rejected { reason: String },

    /// Client request; `id` is echoed back on the response
    Request { id: u64, body: Request },

    Response { id: u64, body: Reply },

    /// Admin asks for booking events to be pushed
    Subscribe,

    /// Subscription is active; every later change is pushed
    Subscribed,

    /// A reservation changed
    Event(BookingEvent),

    /// The subscriber fell behind and `missed` events were dropped
    Lagged { missed: u64 },

    /// Ping to keep connection alive
    Ping,

    /// Pong response to ping
    Pong,

    /// Server is shutting down
    ServerShutdown,
}

impl Message {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Operations a client can ask for.
///
/// Dates are sent as text and reduced to their calendar day on the server,
/// so `2026-01-20` and `2026-01-20T18:30:00Z` name the same day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    ListFields {
        #[serde(default)]
        include_inactive: bool,
    },
    ListHalls {
        #[serde(default)]
        include_inactive: bool,
    },
    FieldDay {
        field_id: Uuid,
        date: String,
    },
    HallCalendar {
        hall_id: Uuid,
        from: String,
        days: u32,
    },
    BookField {
        field_id: Uuid,
        date: String,
        slot: TimeSlot,
        customer: Customer,
    },
    BookHall {
        hall_id: Uuid,
        date: String,
        customer: Customer,
        event_type: String,
        guest_count: u32,
        #[serde(default)]
        message: Option<String>,
    },

    // Admin only from here on
    AddField {
        name: String,
        #[serde(default)]
        surface: Option<String>,
    },
    AddHall {
        name: String,
        capacity: u32,
    },
    SetFieldActive {
        field_id: Uuid,
        active: bool,
    },
    SetHallActive {
        hall_id: Uuid,
        active: bool,
    },
    BookFieldRecurring {
        field_id: Uuid,
        date: String,
        slot: TimeSlot,
        customer: Customer,
        weeks: u32,
    },
    BlockFieldSlot {
        field_id: Uuid,
        date: String,
        slot: TimeSlot,
        #[serde(default = "one_week")]
        weeks: u32,
    },
    BlockHallDate {
        hall_id: Uuid,
        date: String,
        #[serde(default = "one_week")]
        weeks: u32,
    },
    SetFieldStatus {
        id: Uuid,
        status: ReservationStatus,
    },
    SetHallStatus {
        id: Uuid,
        status: ReservationStatus,
    },
    CancelGroup {
        group_id: Uuid,
    },
    DeleteFieldReservation {
        id: Uuid,
    },
    DeleteHallReservation {
        id: Uuid,
    },
    FieldReservations {
        #[serde(default)]
        filter: ReservationFilter,
    },
    HallReservations {
        #[serde(default)]
        filter: ReservationFilter,
    },
    AuditLog {
        #[serde(default = "default_audit_limit")]
        limit: u32,
    },
}

impl Request {
    /// Operations open to every session
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Request::ListFields { .. }
                | Request::ListHalls { .. }
                | Request::FieldDay { .. }
                | Request::HallCalendar { .. }
                | Request::BookField { .. }
                | Request::BookHall { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::ListFields { .. } => "list_fields",
            Request::ListHalls { .. } => "list_halls",
            Request::FieldDay { .. } => "field_day",
            Request::HallCalendar { .. } => "hall_calendar",
            Request::BookField { .. } => "book_field",
            Request::BookHall { .. } => "book_hall",
            Request::AddField { .. } => "add_field",
            Request::AddHall { .. } => "add_hall",
            Request::SetFieldActive { .. } => "set_field_active",
            Request::SetHallActive { .. } => "set_hall_active",
            Request::BookFieldRecurring { .. } => "book_field_recurring",
            Request::BlockFieldSlot { .. } => "block_field_slot",
            Request::BlockHallDate { .. } => "block_hall_date",
            Request::SetFieldStatus { .. } => "set_field_status",
            Request::SetHallStatus { .. } => "set_hall_status",
            Request::CancelGroup { .. } => "cancel_group",
            Request::DeleteFieldReservation { .. } => "delete_field_reservation",
            Request::DeleteHallReservation { .. } => "delete_hall_reservation",
            Request::FieldReservations { .. } => "field_reservations",
            Request::HallReservations { .. } => "hall_reservations",
            Request::AuditLog { .. } => "audit_log",
        }
    }
}

/// Answers to [`Request`]s
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Reply {
    Fields { fields: Vec<Field> },
    Halls { halls: Vec<EventHall> },
    Field { field: Field },
    Hall { hall: EventHall },
    FieldDay {
        field_id: Uuid,
        date: NaiveDate,
        slots: Vec<SlotAvailability>,
    },
    HallCalendar {
        hall_id: Uuid,
        days: Vec<DateAvailability>,
    },
    FieldReservation { reservation: FieldReservation },
    HallReservation { reservation: HallReservation },
    FieldReservations { reservations: Vec<FieldReservation> },
    HallReservations { reservations: Vec<HallReservation> },
    Canceled { count: usize },
    Audit { entries: Vec<AuditEntry> },
    Done,
    Error { code: ErrorCode, message: String },
}

impl Reply {
    /// Reply for a failed operation. Storage and IO details stay in the log.
    pub fn from_error(err: &venue_core::Error) -> Self {
        let code = ErrorCode::from(err);
        let message = match code {
            ErrorCode::Internal => "Internal error".to_string(),
            _ => err.to_string(),
        };
        Reply::Error { code, message }
    }

    pub fn forbidden(op: &str) -> Self {
        Reply::Error {
            code: ErrorCode::Forbidden,
            message: format!("'{}' requires an admin session", op),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    SlotTaken,
    PastSlot,
    Validation,
    InvalidTransition,
    Forbidden,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "not_found",
            ErrorCode::SlotTaken => "slot_taken",
            ErrorCode::PastSlot => "past_slot",
            ErrorCode::Validation => "validation",
            ErrorCode::InvalidTransition => "invalid_transition",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&venue_core::Error> for ErrorCode {
    fn from(err: &venue_core::Error) -> Self {
        use venue_core::Error;
        match err {
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::SlotTaken(_) => ErrorCode::SlotTaken,
            Error::PastSlot(_) => ErrorCode::PastSlot,
            Error::Validation(_) => ErrorCode::Validation,
            Error::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Error::Database(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Serialization(_) => ErrorCode::Internal,
        }
    }
}

/// Change pushed to admin subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    FieldReservationCreated {
        reservation: FieldReservation,
    },
    HallReservationCreated {
        reservation: HallReservation,
    },
    FieldStatusChanged {
        reservation: FieldReservation,
        from: ReservationStatus,
    },
    HallStatusChanged {
        reservation: HallReservation,
        from: ReservationStatus,
    },
    FieldReservationDeleted {
        id: Uuid,
        field_id: Uuid,
        date: NaiveDate,
    },
    HallReservationDeleted {
        id: Uuid,
        hall_id: Uuid,
        date: NaiveDate,
    },
    GroupCanceled {
        group_id: Uuid,
        count: usize,
    },
}
