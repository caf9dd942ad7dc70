//! Duplex byte transport for the lorart LoRa bridge.
//!
//! Provides a unified interface over the two ways the bridge can reach the
//! radio module:
//! - A directly opened serial port (the bridge owns the device)
//! - A host-bridge channel (an embedding host owns the device and pushes
//!   bytes in via callbacks)
//!
//! This is the lowest layer of lorart. Everything else builds on top of the
//! [`Link`] type produced here: a line writer plus an async stream of raw
//! byte chunks. Backend selection happens once, via [`Backend::detect`],
//! and is immutable for the life of the bridge.

pub mod backend;
pub mod error;
pub mod host;
pub mod link;
pub mod serial;

pub use backend::{Backend, SerialConfig};
pub use error::{Result, TransportError};
pub use host::HostBridge;
pub use link::{Link, LinkEvent, LinkEvents, LinkWriter};
pub use serial::DEFAULT_BAUD_RATE;
