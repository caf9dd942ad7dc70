//! Line framing and the AT uplink/downlink codec.
//!
//! The radio module speaks a line-oriented AT dialect over a byte stream
//! that arrives in arbitrary chunks. This crate turns chunks into trimmed
//! logical lines ([`LineFramer`]) and converts between JSON payloads and
//! the hex-over-text AT frames the module understands ([`UplinkCommand`],
//! [`DownlinkFrame`]).
//!
//! Everything here is synchronous and transport-agnostic.

pub mod codec;
pub mod error;
pub mod lines;

pub use codec::{DownlinkFrame, UplinkCommand, DEFAULT_FPORT};
pub use error::{CodecError, Result};
pub use lines::LineFramer;
