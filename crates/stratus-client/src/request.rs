//! HTTP/1.0 request serialization
//!
//! One fixed header block per request: request line, `Host`, the API-key
//! header, `Content-Type`/`Content-Length` when a body is present, and the
//! configured user-agent. The response side never reuses the connection,
//! so no keep-alive negotiation happens here.

use tracing::debug;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::transport::Transport;

/// URL-encode a resource id for use in a path segment.
///
/// Ids with an embedded `/` must stay a single segment rather than being
/// split in two by the literal separator.
pub(crate) fn encode_path_segment(id: &str) -> String {
    id.replace('/', "%2F")
}

/// Write a complete request onto the transport.
pub(crate) fn write_request<T: Transport>(
    transport: &mut T,
    config: &ClientConfig,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> Result<()> {
    let mut head = String::with_capacity(128);
    head.push_str(&format!("{method} {path} HTTP/1.0\r\n"));
    head.push_str(&format!("Host: {}\r\n", config.host));
    head.push_str(&format!("X-Stratus-Key: {}\r\n", config.api_key));
    if let Some(body) = body {
        head.push_str("Content-Type: application/json\r\n");
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str(&format!("User-Agent: {}\r\n", config.user_agent));
    head.push_str("\r\n");

    transport.write_all(head.as_bytes())?;
    if let Some(body) = body {
        transport.write_all(body.as_bytes())?;
    }
    debug!(method, path, body_len = body.map_or(0, str::len), "request written");
    Ok(())
}
