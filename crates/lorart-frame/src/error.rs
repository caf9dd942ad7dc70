/// Errors from encoding or decoding AT payload frames.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload hex field could not be decoded.
    #[error("invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The decoded payload bytes are not valid UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The payload text is not valid JSON, or a value could not be
    /// serialized.
    #[error("payload JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
