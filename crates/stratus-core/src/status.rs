//! Status-code taxonomy shared by every client operation

use std::fmt;

use serde::{Deserialize, Serialize};

/// Combined HTTP/local status code for one request/response cycle.
///
/// `0` is success without an HTTP exchange, negative values are local error
/// codes, and 100-599 are literal HTTP status codes from the service.
/// Within the HTTP range, 2xx is success, 4xx a client error and 5xx a
/// server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(pub i32);

impl Status {
    /// Success with no HTTP status attached
    pub const OK: Status = Status(0);
    /// Transport was never connected
    pub const NO_CONNECTION: Status = Status(-1);
    /// Connection closed while a response was still being parsed
    pub const DISCONNECTED: Status = Status(-2);
    /// Deadline elapsed while waiting for response bytes
    pub const NOT_REACHABLE: Status = Status(-3);
    /// Caller-supplied input rejected before any I/O happened
    pub const INVALID: Status = Status(-4);
    /// Response body did not match the expected document shape
    pub const JSON_INVALID: Status = Status(-5);
    /// Caller buffer cannot hold the result
    pub const BUFFER_TOO_SMALL: Status = Status(-6);
    /// Local tick source behind its sync point even after a fresh sync
    pub const TIMESTAMP_ERROR: Status = Status(-8);

    /// `0` or any 2xx HTTP status
    pub fn is_success(self) -> bool {
        self.0 == 0 || (200..=299).contains(&self.0)
    }

    /// 4xx HTTP status
    pub fn is_client_error(self) -> bool {
        (400..=499).contains(&self.0)
    }

    /// 5xx HTTP status
    pub fn is_server_error(self) -> bool {
        (500..=599).contains(&self.0)
    }

    /// Any 4xx or 5xx HTTP status
    pub fn is_error(self) -> bool {
        self.is_client_error() || self.is_server_error()
    }

    /// Whether this is a literal HTTP status code
    pub fn is_http(self) -> bool {
        (100..=599).contains(&self.0)
    }

    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status(code)
    }
}
