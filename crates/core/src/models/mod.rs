//! Data models for Venue

mod audit;
mod field;
mod hall;
mod reservation;
mod slot;

pub use audit::*;
pub use field::*;
pub use hall::*;
pub use reservation::*;
pub use slot::*;
