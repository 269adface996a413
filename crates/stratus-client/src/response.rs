//! HTTP response parsing state machine
//!
//! Consumes a live byte stream off the transport one byte at a time:
//! status line, header scan with opportunistic `Content-Length` discovery,
//! then the body. Nothing is buffered beyond the current match position,
//! so memory stays flat no matter how large the response is.
//!
//! Every blocking wait is bounded by the reader's deadline; a silently
//! dead connection surfaces as [`Error::NotReachable`], a connection that
//! closes mid-parse as [`Error::Disconnected`], and one that never opened
//! as [`Error::NoConnection`].

use std::io::{self, Read};
use std::time::{Duration, Instant};

use stratus_core::Status;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportError};

/// Wildcard byte in [`ResponseReader::wait_for_pattern`] templates:
/// matches any single byte.
pub const PATTERN_WILDCARD: u8 = b'*';

/// Incremental matcher over a fixed literal template.
///
/// Fed one byte at a time; `*` matches any single byte. On a mismatch the
/// match restarts and the mismatching byte is re-tested against the start
/// of the template, so every scanned byte is consumed exactly once and the
/// stream position always advances.
#[derive(Debug)]
struct PatternMatcher<'p> {
    pattern: &'p [u8],
    pos: usize,
    case_insensitive: bool,
}

impl<'p> PatternMatcher<'p> {
    fn new(pattern: &'p [u8], case_insensitive: bool) -> Self {
        Self {
            pattern,
            pos: 0,
            case_insensitive,
        }
    }

    fn feed(&mut self, byte: u8) -> bool {
        if byte_matches(self.pattern[self.pos], byte, self.case_insensitive) {
            self.pos += 1;
        } else {
            self.pos = 0;
            if byte_matches(self.pattern[0], byte, self.case_insensitive) {
                self.pos = 1;
            }
        }
        if self.pos == self.pattern.len() {
            self.pos = 0;
            true
        } else {
            false
        }
    }
}

fn byte_matches(expected: u8, byte: u8, case_insensitive: bool) -> bool {
    expected == PATTERN_WILDCARD
        || expected == byte
        || (case_insensitive && expected.eq_ignore_ascii_case(&byte))
}

/// Borrows the transport for the duration of one response cycle.
///
/// The reader owns terminal cleanup: [`ResponseReader::close`] is called
/// on every path, success or failure, so callers never touch the
/// connection while a read is outstanding.
pub struct ResponseReader<'t, T: Transport> {
    transport: &'t mut T,
    read_timeout: Duration,
    poll_interval: Duration,
    case_insensitive: bool,
    body_error: Option<Error>,
}

impl<'t, T: Transport> ResponseReader<'t, T> {
    pub fn new(
        transport: &'t mut T,
        read_timeout: Duration,
        poll_interval: Duration,
        case_insensitive: bool,
    ) -> Self {
        Self {
            transport,
            read_timeout,
            poll_interval,
            case_insensitive,
            body_error: None,
        }
    }

    /// Cooperatively block for the next byte, bounded by the deadline.
    fn next_byte(&mut self) -> Result<u8> {
        let deadline = Instant::now() + self.read_timeout;
        loop {
            match self.transport.read_byte() {
                Ok(Some(byte)) => return Ok(byte),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        return Err(Error::NotReachable);
                    }
                    std::thread::sleep(self.poll_interval);
                }
                Err(TransportError::Closed) => return Err(Error::Disconnected),
                Err(TransportError::NotConnected) => return Err(Error::NoConnection),
                Err(_) => return Err(Error::Disconnected),
            }
        }
    }

    /// Read the HTTP status line and return its status code.
    ///
    /// Consumes the whole line, leaving the stream at the first header
    /// line (or at the blank line when there are no headers).
    pub fn read_status(&mut self) -> Result<Status> {
        if !self.transport.connected() {
            return Err(Error::NoConnection);
        }
        self.wait_for_pattern(b"HTTP/*.* ")?;

        let mut code: i32 = 0;
        let mut digits = 0;
        let terminator;
        loop {
            let byte = self.next_byte()?;
            if byte.is_ascii_digit() {
                code = code * 10 + (byte - b'0') as i32;
                digits += 1;
            } else {
                terminator = byte;
                break;
            }
        }
        // a status line that breaks off mid-code reads as a lost connection
        if digits != 3 || !(100..=599).contains(&code) {
            return Err(Error::Disconnected);
        }
        if terminator != b'\n' {
            while self.next_byte()? != b'\n' {}
        }

        debug!(status = code, "status line read");
        Ok(Status(code))
    }

    /// Scan header lines for `Content-Length`, stopping at the blank line.
    ///
    /// Returns as soon as the length is parsed; remaining header lines are
    /// left for [`ResponseReader::skip_to_body`]. `Ok(None)` means the
    /// whole header block, blank line included, has been consumed without
    /// a declared length: the stream sits at the body, which runs until
    /// the connection closes. No header is buffered, recognized or not.
    pub fn scan_headers(&mut self) -> Result<Option<usize>> {
        const TEMPLATE: &[u8] = b"Content-Length:";
        loop {
            // one header line per iteration, matched from the line start
            let mut pos = 0;
            let mut dead = false;
            let mut line_len = 0usize;
            loop {
                let byte = self.next_byte()?;
                match byte {
                    b'\r' => continue,
                    b'\n' => {
                        if line_len == 0 {
                            trace!("header block ended without content length");
                            return Ok(None);
                        }
                        break;
                    }
                    _ => {}
                }
                line_len += 1;
                if dead {
                    continue;
                }
                if byte_matches(TEMPLATE[pos], byte, self.case_insensitive) {
                    pos += 1;
                    if pos == TEMPLATE.len() {
                        if let Some(length) = self.read_length_value()? {
                            debug!(content_length = length, "content length found");
                            return Ok(Some(length));
                        }
                        break;
                    }
                } else {
                    dead = true;
                }
            }
        }
    }

    /// Parse the numeric header value, consuming through the end of the
    /// line. `None` when the line carried no digits.
    fn read_length_value(&mut self) -> Result<Option<usize>> {
        let mut value: usize = 0;
        let mut digits = 0;
        let mut done = false;
        loop {
            let byte = self.next_byte()?;
            match byte {
                b'\n' => break,
                b'\r' => {}
                b' ' | b'\t' if digits == 0 && !done => {}
                b'0'..=b'9' if !done => {
                    value = value.saturating_mul(10).saturating_add((byte - b'0') as usize);
                    digits += 1;
                }
                _ => done = true,
            }
        }
        Ok((digits > 0).then_some(value))
    }

    /// Discard the rest of the header block. Must be entered at a line
    /// boundary; a zero-length line ends the block.
    pub fn skip_to_body(&mut self) -> Result<()> {
        let mut line_len = 0usize;
        loop {
            let byte = self.next_byte()?;
            match byte {
                b'\r' => {}
                b'\n' => {
                    if line_len == 0 {
                        trace!("header block skipped");
                        return Ok(());
                    }
                    line_len = 0;
                }
                _ => line_len += 1,
            }
        }
    }

    /// Consume bytes until `pattern` has been seen. Every scanned byte is
    /// discarded, matching or not.
    pub fn wait_for_pattern(&mut self, pattern: &[u8]) -> Result<()> {
        debug_assert!(!pattern.is_empty());
        let mut matcher = PatternMatcher::new(pattern, self.case_insensitive);
        loop {
            let byte = self.next_byte()?;
            if matcher.feed(byte) {
                return Ok(());
            }
        }
    }

    /// Expose the body as a [`Read`], bounded by the declared content
    /// length, or running until the peer closes when none was declared.
    pub fn body_reader<'r>(&'r mut self, content_length: Option<usize>) -> BodyReader<'r, 't, T> {
        BodyReader {
            reader: self,
            remaining: content_length,
            closed: false,
            pending_error: None,
        }
    }

    /// Copy a content-length-delimited body into `buf`, NUL-terminated.
    ///
    /// The required capacity (`content_length + 1`) is checked and
    /// reported before any byte is read, so a failed read never hides it.
    pub fn read_body_into(&mut self, content_length: usize, buf: &mut [u8]) -> Result<usize> {
        let required = content_length + 1;
        if buf.len() < required {
            return Err(Error::BufferTooSmall { required });
        }
        for slot in buf.iter_mut().take(content_length) {
            *slot = self.next_byte()?;
        }
        buf[content_length] = 0;
        Ok(content_length)
    }

    /// Transport error recorded while a [`BodyReader`] was being driven
    /// through `io::Read`, if any.
    pub fn take_body_error(&mut self) -> Option<Error> {
        self.body_error.take()
    }

    /// Release the connection. Called on every terminal path.
    pub fn close(&mut self) {
        self.transport.stop();
    }
}

/// `io::Read` over the response body.
///
/// With a declared content length, reads stop exactly at the boundary.
/// Without one, a peer close is the end of the body. Transport failures
/// are recorded on the parent reader so the caller can tell a dead
/// connection apart from a malformed document after a streaming parse.
pub struct BodyReader<'r, 't, T: Transport> {
    reader: &'r mut ResponseReader<'t, T>,
    remaining: Option<usize>,
    closed: bool,
    pending_error: Option<Error>,
}

impl<T: Transport> Read for BodyReader<'_, '_, T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed || buf.is_empty() {
            return Ok(0);
        }
        let cap = match self.remaining {
            Some(0) => return Ok(0),
            Some(remaining) => remaining.min(buf.len()),
            None => buf.len(),
        };
        let mut filled = 0;
        while filled < cap {
            let next = match self.pending_error.take() {
                Some(err) => Err(err),
                None => self.reader.next_byte(),
            };
            match next {
                Ok(byte) => {
                    buf[filled] = byte;
                    filled += 1;
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    // hand back what we have once the transport runs dry;
                    // the next call polls again
                    if filled < cap && self.reader.transport.available() == 0 {
                        break;
                    }
                }
                Err(Error::Disconnected) if self.remaining.is_none() => {
                    // no declared length: a peer close ends the body
                    self.closed = true;
                    break;
                }
                Err(err) => {
                    if filled > 0 {
                        // deliver what arrived first; the error resurfaces
                        // on the next call
                        self.pending_error = Some(err);
                        break;
                    }
                    self.reader.body_error = Some(err.clone());
                    return Err(io::Error::new(io::ErrorKind::Other, err));
                }
            }
        }
        Ok(filled)
    }
}
