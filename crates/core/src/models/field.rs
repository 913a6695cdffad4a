//! Field model - a sports field booked per time slot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable sports field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: Uuid,
    pub name: String,
    /// Free-form surface/format description ("synthetic, 5-a-side")
    pub surface: Option<String>,
    /// Inactive fields stay in history but refuse new bookings
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Field {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            surface: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_surface(mut self, surface: String) -> Self {
        self.surface = Some(surface);
        self
    }
}
