//! Error types for Stratus client operations

use stratus_core::time::TimeError;
use stratus_core::Status;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for Stratus client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during Stratus client operations.
///
/// Connectivity errors (`NoConnection`, `Disconnected`, `NotReachable`) are
/// surfaced unchanged and never retried internally; the first two are kept
/// distinct because the caller's retry policy differs (reconnect immediately
/// vs. back off). Input errors are surfaced immediately. Partial progress
/// stays observable: consumer callbacks issued before a mid-stream error
/// remain valid results.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Transport was never connected
    #[error("no connection to the service")]
    NoConnection,

    /// Connection closed while a response was still being parsed
    #[error("connection closed before the response completed")]
    Disconnected,

    /// Deadline elapsed while waiting for response bytes
    #[error("service not reachable: no data within the read deadline")]
    NotReachable,

    /// Caller-supplied input rejected before any I/O happened
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Response body did not match the expected document shape
    #[error("response body is not a valid document for this operation")]
    JsonInvalid,

    /// Caller buffer cannot hold the result; `required` is the exact
    /// capacity a retry needs
    #[error("buffer too small: {required} bytes required")]
    BufferTooSmall { required: usize },

    /// Local tick source behind its sync point even after a fresh sync
    #[error("local clock behind its sync point after a fresh sync")]
    TimestampError,

    /// The service answered with a non-success HTTP status where a parsed
    /// body was required
    #[error("service returned HTTP status {0}")]
    Http(Status),
}

impl Error {
    /// Map onto the service's numeric code space: negative local codes, or
    /// the literal HTTP status for [`Error::Http`].
    pub fn status(&self) -> Status {
        match self {
            Error::NoConnection => Status::NO_CONNECTION,
            Error::Disconnected => Status::DISCONNECTED,
            Error::NotReachable => Status::NOT_REACHABLE,
            Error::InvalidArgument(_) => Status::INVALID,
            Error::JsonInvalid => Status::JSON_INVALID,
            Error::BufferTooSmall { .. } => Status::BUFFER_TOO_SMALL,
            Error::TimestampError => Status::TIMESTAMP_ERROR,
            Error::Http(status) => *status,
        }
    }

    pub fn code(&self) -> i32 {
        self.status().code()
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectFailed(_) | TransportError::NotConnected => Error::NoConnection,
            TransportError::Closed => Error::Disconnected,
            TransportError::SendFailed(_) => Error::Disconnected,
        }
    }
}

impl From<TimeError> for Error {
    fn from(err: TimeError) -> Self {
        match err {
            TimeError::BufferTooSmall { required } => Error::BufferTooSmall { required },
            TimeError::OutOfRange | TimeError::Malformed => Error::TimestampError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_code_space() {
        assert_eq!(Error::NoConnection.code(), -1);
        assert_eq!(Error::Disconnected.code(), -2);
        assert_eq!(Error::NotReachable.code(), -3);
        assert_eq!(Error::InvalidArgument("x".into()).code(), -4);
        assert_eq!(Error::JsonInvalid.code(), -5);
        assert_eq!(Error::BufferTooSmall { required: 25 }.code(), -6);
        assert_eq!(Error::TimestampError.code(), -8);
        assert_eq!(Error::Http(Status(404)).code(), 404);
    }
}
