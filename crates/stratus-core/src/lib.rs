//! stratus-core - Core types for the Stratus device client
//!
//! This crate holds the pieces of the client that perform no I/O: the
//! status-code taxonomy shared by every operation, the record models
//! extracted from response bodies, and the ISO-8601 calendar arithmetic
//! used by the clock service.

pub mod models;
pub mod status;
pub mod time;

pub use models::{DataValue, LocationFix, StreamUpdate, StreamValue};
pub use status::Status;
pub use time::{
    format_timestamp, format_timestamp64, parse_timestamp, TimeError, TIMESTAMP_BUFFER_LEN,
    TIMESTAMP_LEN,
};
