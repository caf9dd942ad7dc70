/// Ways the OTAA join handshake can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    /// The transport is not connected; nothing was sent.
    #[error("cannot join: transport not connected")]
    NotConnected,

    /// Another join attempt is already running on this bridge.
    #[error("a join attempt is already in progress")]
    AlreadyInProgress,

    /// The global join timer expired before any terminal marker arrived.
    #[error("join attempt timed out")]
    Timeout,

    /// The module reported a join failure marker.
    #[error("join rejected by the device")]
    RejectedByDevice,

    /// The module reported an AT protocol error during the attempt.
    #[error("AT protocol error during join")]
    ProtocolError,
}

pub type Result<T> = std::result::Result<T, JoinError>;
