//! Mock transport for tests
//!
//! Responses are scripted as a queue of chunks, so a test can deliver the
//! same response in one piece or one byte per poll and assert that parsing
//! is chunk-boundary independent. Everything the client writes is captured
//! for asserting the outbound request bytes.

use std::collections::VecDeque;

use bytes::Bytes;

use super::{Transport, TransportError};

/// Scripted byte-stream transport.
///
/// By default the stream reports closed once the script drains, which is
/// how a server ends a response with no `Content-Length`. Tests that need
/// a silently dead connection call [`MockTransport::keep_open_after_script`].
#[derive(Debug, Default)]
pub struct MockTransport {
    connected: bool,
    refuse_connect: bool,
    keep_open: bool,
    incoming: VecDeque<Bytes>,
    cursor: usize,
    written: Vec<u8>,
    stops: usize,
}

impl MockTransport {
    /// A transport that is already connected with an empty script
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    /// A transport that was never connected and refuses to connect
    pub fn unreachable() -> Self {
        Self {
            connected: false,
            refuse_connect: true,
            ..Self::default()
        }
    }

    /// Queue one inbound chunk. An empty chunk is delivered as a single
    /// zero-byte poll, which is how a slow link looks to the reader.
    pub fn push_chunk(&mut self, chunk: impl Into<Bytes>) {
        self.incoming.push_back(chunk.into());
    }

    /// Queue a whole response as one chunk
    pub fn push_response(&mut self, response: impl AsRef<[u8]>) {
        self.push_chunk(Bytes::copy_from_slice(response.as_ref()));
    }

    /// Queue a whole response delivered one byte per poll
    pub fn push_response_bytewise(&mut self, response: impl AsRef<[u8]>) {
        for &byte in response.as_ref() {
            self.push_chunk(Bytes::copy_from_slice(&[byte]));
        }
    }

    /// Keep reporting "no data yet" after the script drains instead of
    /// closing, simulating a silently dead connection
    pub fn keep_open_after_script(&mut self) {
        self.keep_open = true;
    }

    /// Everything the client wrote, in write order
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }

    /// Number of times `stop` was called; every terminal path must close
    pub fn stop_count(&self) -> usize {
        self.stops
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Transport for MockTransport {
    fn connect(&mut self, _host: &str, _port: u16) -> Result<(), TransportError> {
        if self.refuse_connect {
            return Err(TransportError::ConnectFailed("scripted refusal".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    fn connected(&self) -> bool {
        self.connected
    }

    fn available(&mut self) -> usize {
        match self.incoming.front() {
            Some(chunk) => chunk.len() - self.cursor,
            None => 0,
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        match self.incoming.front() {
            Some(chunk) if self.cursor < chunk.len() => {
                let byte = chunk[self.cursor];
                self.cursor += 1;
                if self.cursor == chunk.len() {
                    self.incoming.pop_front();
                    self.cursor = 0;
                }
                Ok(Some(byte))
            }
            Some(_) => {
                // empty chunk: one scripted zero-byte poll
                self.incoming.pop_front();
                self.cursor = 0;
                Ok(None)
            }
            None => {
                if self.keep_open {
                    return Ok(None);
                }
                self.connected = false;
                Err(TransportError::Closed)
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn stop(&mut self) {
        self.connected = false;
        self.stops += 1;
    }
}
