//! Venue Network Library
//!
//! Serves the booking desk over TCP.
//!
//! # Architecture
//!
//! - **Server**: owns the desk, one session per connection
//! - **Client**: request/reply with id correlation, plus pushed events
//! - **Protocol**: length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! let server = Server::start(addr, desk, ServerOptions::new(token)).await?;
//!
//! let mut admin = Client::connect(server.addr(), "front-desk", Some(token)).await?;
//! admin.subscribe().await?;
//! while let Some(event) = admin.next_event().await {
//!     match event {
//!         ClientEvent::Booking(change) => { /* refresh */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod dispatch;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{Client, ClientEvent};
pub use error::{Error, Result};
pub use frame::MAX_FRAME_SIZE;
pub use protocol::{BookingEvent, ErrorCode, Message, Reply, Request};
pub use server::{Server, ServerOptions};
pub use venue_core::config::DEFAULT_PORT;
