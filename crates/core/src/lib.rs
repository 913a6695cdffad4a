//! Venue Core Library
//!
//! Models, availability rules, the booking desk, and SQLite storage for the
//! Venue booking service.

pub mod availability;
pub mod booking;
pub mod config;
pub mod error;
pub mod invariants;
pub mod models;
pub mod recurrence;
pub mod storage;
pub mod validation;

pub use availability::{Audience, DateAvailability, SlotAvailability, SlotState};
pub use booking::{BookingDesk, FieldBookingRequest, HallBookingRequest};
pub use config::{BookingRules, VenueConfig};
pub use error::{Error, Result};
pub use models::*;
pub use storage::{
    AuditRepository, Database, ReservationRepository, ResourceRepository, Storage,
};
