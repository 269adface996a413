//! Stratus Client Library
//!
//! Device-side client for the Stratus telemetry service. The client
//! speaks HTTP/1.0 over a raw byte-stream transport and is built for
//! severely memory-constrained devices: responses are parsed one byte at
//! a time with no header buffering, and listing bodies of unbounded
//! length are converted into a stream of discrete records delivered to a
//! callback one at a time, so memory stays flat no matter how much data
//! the service returns.
//!
//! # Example
//!
//! ```rust,no_run
//! use stratus_client::transport::TcpTransport;
//! use stratus_client::{ClientConfig, StratusClient};
//!
//! fn main() -> stratus_client::Result<()> {
//!     let config = ClientConfig::new("0123456789abcdef");
//!     let mut client = StratusClient::new(TcpTransport::new(), config);
//!
//!     // Push one reading
//!     let status = client.update_stream_value("greenhouse-7", "temperature", 21.5)?;
//!     assert!(status.is_success());
//!
//!     // Walk the recorded values without holding more than one in memory
//!     client.list_stream_values("greenhouse-7", "temperature", None, |value| {
//!         println!("{} -> {:?}", value.timestamp, value.value);
//!     })?;
//!     Ok(())
//! }
//! ```
//!
//! # Timestamps
//!
//! The [`clock`] module reconstructs wall-clock time from a single
//! network sync plus the local tick counter, so records can be stamped
//! without a network round trip each time:
//!
//! ```rust,no_run
//! use stratus_client::clock::{ClockService, SystemTickSource};
//! use stratus_client::transport::TcpTransport;
//! use stratus_client::{ClientConfig, StratusClient};
//!
//! fn main() -> stratus_client::Result<()> {
//!     let mut client = StratusClient::new(TcpTransport::new(), ClientConfig::new("key"));
//!     let mut clock = ClockService::new(SystemTickSource::new());
//!     clock.init(&mut client)?;
//!
//!     let mut buf = [0u8; stratus_client::TIMESTAMP_BUFFER_LEN];
//!     let n = clock.get_timestamp(&mut client, &mut buf)?;
//!     let stamp = std::str::from_utf8(&buf[..n]).unwrap();
//!     client.update_stream_value("greenhouse-7", "door-open", stamp)?;
//!     Ok(())
//! }
//! ```

mod client;
pub mod clock;
mod config;
mod error;
mod request;
mod response;
pub mod streaming;
pub mod transport;

pub use client::StratusClient;
pub use config::{ClientConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Error, Result};
pub use response::{BodyReader, ResponseReader, PATTERN_WILDCARD};

// Re-export core types for convenience
pub use stratus_core::models::{DataValue, LocationFix, StreamUpdate, StreamValue};
pub use stratus_core::{Status, TIMESTAMP_BUFFER_LEN, TIMESTAMP_LEN};
