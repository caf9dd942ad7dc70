//! Connection lifecycle, join state machine, and line event bus for the
//! lorart LoRa bridge.
//!
//! The central type is [`LoraBridge`]: one instance per physical module,
//! holding the transport writer, the connected/joined flags, and the
//! broadcast bus every received line flows through. The OTAA join
//! handshake, the uplink path, reboot detection, and downlink dispatch
//! all hang off it.
//!
//! Layering: this crate consumes `lorart-transport` for the byte channel
//! and `lorart-frame` for line framing and payload codecs; it exposes the
//! operations applications call.

pub mod bridge;
pub mod bus;
pub mod error;
mod join;
pub mod profile;
pub mod spots;

pub use bridge::LoraBridge;
pub use bus::{LineBus, LineEvent};
pub use error::{JoinError, Result};
pub use profile::RadioProfile;
pub use spots::SpotCodeMap;
