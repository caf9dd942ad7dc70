/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No backend is available (no host bridge present, no serial device
    /// configured).
    #[error("no transport backend available (host bridge absent, no serial device configured)")]
    Unavailable,

    /// Failed to open the serial device.
    #[error("failed to open serial device {device}: {source}")]
    Open {
        device: String,
        source: serialport::Error,
    },

    /// A write was attempted while the link is not connected.
    #[error("transport not connected")]
    NotConnected,

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
