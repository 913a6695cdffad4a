//! Venue configuration
//!
//! Loaded from a TOML file. Every section is optional; a missing file
//! means defaults everywhere.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 7340
//!
//! [booking]
//! # Leave out `slots` to fill the day from 09:00 with back-to-back slots
//! slots = ["09:00", "10:30", "12:00"]
//! slot_minutes = 90
//! horizon_days = 90
//!
//! [admin]
//! token = "change-me"
//!
//! [[fields]]
//! name = "Field A"
//! surface = "synthetic, 7-a-side"
//!
//! [[halls]]
//! name = "Garden Hall"
//! capacity = 150
//! ```

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveTime;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::TimeSlot;

/// Default port for the booking service
pub const DEFAULT_PORT: u16 = 7340;

const DEFAULT_SLOT_MINUTES: u32 = 90;
const DEFAULT_HORIZON_DAYS: u32 = 90;
const DEFAULT_MAX_RECURRENCE_WEEKS: u32 = 12;
const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub booking: BookingRules,
    pub admin: AdminConfig,
    pub fields: Vec<FieldSeed>,
    pub halls: Vec<HallSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; relative paths resolve against the data directory
    pub path: Option<PathBuf>,
}

/// Rules the booking desk applies to every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRules {
    /// Start times offered on every field, every day. Empty means the
    /// default day schedule for `slot_minutes`.
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
    /// Length of one slot
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
    /// How many days ahead customers may book
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Upper bound for admin-created weekly series
    #[serde(default = "default_max_recurrence_weeks")]
    pub max_recurrence_weeks: u32,
}

fn default_slot_minutes() -> u32 {
    DEFAULT_SLOT_MINUTES
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

fn default_max_recurrence_weeks() -> u32 {
    DEFAULT_MAX_RECURRENCE_WEEKS
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            slots: day_schedule(DEFAULT_SLOT_MINUTES),
            slot_minutes: DEFAULT_SLOT_MINUTES,
            horizon_days: DEFAULT_HORIZON_DAYS,
            max_recurrence_weeks: DEFAULT_MAX_RECURRENCE_WEEKS,
        }
    }
}

/// Back-to-back slots from 09:00, the last one ending by midnight
pub fn day_schedule(slot_minutes: u32) -> Vec<TimeSlot> {
    let first = TimeSlot::from(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN));
    if slot_minutes == 0 {
        return Vec::new();
    }
    let count = (MINUTES_PER_DAY - 9 * 60) / slot_minutes;
    TimeSlot::series(first, slot_minutes, count as usize)
}

impl BookingRules {
    /// Check the rules and normalize the slot list (sorted, no duplicates).
    /// Slots may not start closer together than `slot_minutes`.
    pub fn validate(&mut self) -> Result<()> {
        if self.slot_minutes == 0 || self.slot_minutes > MINUTES_PER_DAY {
            return Err(Error::Validation(
                "booking.slot_minutes must be between 1 and 1440".into(),
            ));
        }
        if self.max_recurrence_weeks == 0 {
            return Err(Error::Validation(
                "booking.max_recurrence_weeks must be positive".into(),
            ));
        }
        if self.slots.is_empty() {
            self.slots = day_schedule(self.slot_minutes);
        }
        if self.slots.is_empty() {
            return Err(Error::Validation(
                "booking.slot_minutes leaves no slot in the day".into(),
            ));
        }

        self.slots.sort();
        self.slots.dedup();
        for pair in self.slots.windows(2) {
            let gap = (pair[1].start() - pair[0].start()).num_minutes();
            if gap < i64::from(self.slot_minutes) {
                return Err(Error::Validation(format!(
                    "booking.slots {} and {} overlap with {}-minute slots",
                    pair[0], pair[1], self.slot_minutes
                )));
            }
        }
        Ok(())
    }

    pub fn offers(&self, slot: TimeSlot) -> bool {
        self.slots.contains(&slot)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Shared secret that unlocks admin operations
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSeed {
    pub name: String,
    #[serde(default)]
    pub surface: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HallSeed {
    pub name: String,
    pub capacity: u32,
}

impl VenueConfig {
    /// Load from a file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            let mut config = Self::default();
            config.booking.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: VenueConfig = toml::from_str(content)?;
        config.booking.validate()?;
        Ok(config)
    }

    /// Database location, resolved against `data_dir` when relative
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        match &self.storage.path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => data_dir.join(p),
            None => data_dir.join("venue.db"),
        }
    }

    /// Admin token from config, or a freshly generated one.
    /// The flag is true when the token was generated.
    pub fn admin_token_or_generate(&self) -> (String, bool) {
        match &self.admin.token {
            Some(token) if !token.trim().is_empty() => (token.clone(), false),
            _ => (generate_admin_token(), true),
        }
    }
}

/// Random URL-safe admin token (32 bytes of entropy)
pub fn generate_admin_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
