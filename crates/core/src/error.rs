//! Error types for Venue Core

use thiserror::Error;

use crate::models::ReservationStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already booked: {0}")]
    SlotTaken(String),

    #[error("In the past: {0}")]
    PastSlot(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
