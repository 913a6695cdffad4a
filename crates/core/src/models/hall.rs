//! Event hall model - booked per whole day

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event hall rented for a full day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHall {
    pub id: Uuid,
    pub name: String,
    /// Maximum number of guests
    pub capacity: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl EventHall {
    pub fn new(name: String, capacity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            capacity,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
