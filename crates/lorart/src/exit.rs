use std::fmt;

use lorart_bridge::JoinError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn join_error(context: &str, err: JoinError) -> CliError {
    let code = match err {
        JoinError::NotConnected | JoinError::ProtocolError => TRANSPORT_ERROR,
        JoinError::AlreadyInProgress => INTERNAL,
        JoinError::Timeout => TIMEOUT,
        JoinError::RejectedByDevice => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_errors_map_to_distinct_codes() {
        assert_eq!(join_error("x", JoinError::Timeout).code, TIMEOUT);
        assert_eq!(join_error("x", JoinError::RejectedByDevice).code, FAILURE);
        assert_eq!(join_error("x", JoinError::NotConnected).code, TRANSPORT_ERROR);
    }
}
