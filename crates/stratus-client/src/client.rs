//! Stratus client facade
//!
//! One client owns one transport and runs strict request/response cycles
//! over it: write the request, parse the response, close. Nothing is
//! retried internally; connectivity errors surface unchanged so the
//! caller can apply its own policy.

use serde::de::DeserializeOwned;
use serde_json::json;
use stratus_core::models::{LocationFix, StreamUpdate, StreamValue};
use stratus_core::time::parse_timestamp;
use stratus_core::{DataValue, Status};
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::request::{encode_path_segment, write_request};
use crate::response::ResponseReader;
use crate::streaming::extract_records;
use crate::transport::Transport;

/// Device-side client for the Stratus telemetry service.
///
/// Single-threaded and fully synchronous: every operation runs to
/// completion or to a deadline-driven failure before returning, and at
/// most one cycle is ever outstanding on the transport.
#[derive(Debug)]
pub struct StratusClient<T: Transport> {
    transport: T,
    config: ClientConfig,
}

impl<T: Transport> StratusClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // =========================================================================
    // Stream Operations
    // =========================================================================

    /// Push one value onto a device stream. Returns the HTTP status.
    #[instrument(skip(self, value))]
    pub fn update_stream_value(
        &mut self,
        device_id: &str,
        stream_name: &str,
        value: impl Into<DataValue>,
    ) -> Result<Status> {
        require_id("device id", device_id)?;
        require_id("stream name", stream_name)?;

        let value: DataValue = value.into();
        let body = json!({ "value": value }).to_string();
        let path = format!(
            "/v2/devices/{}/streams/{}/value",
            encode_path_segment(device_id),
            encode_path_segment(stream_name)
        );
        self.status_cycle("PUT", &path, Some(&body))
    }

    /// Post a batch of values to several streams at once.
    #[instrument(skip(self, updates))]
    pub fn post_device_updates(
        &mut self,
        device_id: &str,
        updates: &[(&str, &[StreamUpdate])],
    ) -> Result<Status> {
        require_id("device id", device_id)?;
        if updates.is_empty() {
            return Err(Error::InvalidArgument("no stream updates given".to_string()));
        }

        let mut values = serde_json::Map::new();
        for (stream_name, items) in updates {
            require_id("stream name", stream_name)?;
            let array = serde_json::to_value(*items)
                .map_err(|_| Error::InvalidArgument("unserializable update".to_string()))?;
            values.insert((*stream_name).to_string(), array);
        }
        let body = json!({ "values": values }).to_string();
        let path = format!("/v2/devices/{}/updates", encode_path_segment(device_id));
        self.status_cycle("POST", &path, Some(&body))
    }

    /// List the values recorded on a stream, delivering each one to
    /// `on_value` as soon as it is parsed.
    ///
    /// The body is parsed only when the service answered with success; on
    /// any other status the callback never fires and the status is
    /// returned as-is. Values already delivered before a mid-document
    /// error remain valid.
    #[instrument(skip(self, on_value))]
    pub fn list_stream_values<F>(
        &mut self,
        device_id: &str,
        stream_name: &str,
        query: Option<&str>,
        mut on_value: F,
    ) -> Result<Status>
    where
        F: FnMut(StreamValue),
    {
        require_id("device id", device_id)?;
        require_id("stream name", stream_name)?;

        let mut path = format!(
            "/v2/devices/{}/streams/{}/values",
            encode_path_segment(device_id),
            encode_path_segment(stream_name)
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            path.push('?');
            path.push_str(query);
        }

        self.begin_cycle("GET", &path, None)?;
        let (timeout, poll, ci) = self.reader_params();
        let mut reader = ResponseReader::new(&mut self.transport, timeout, poll, ci);
        let outcome = Self::streamed_cycle(&mut reader, "values", &mut on_value);
        reader.close();
        outcome
    }

    /// Delete the values recorded on a stream between two ISO-8601
    /// timestamps, both inclusive. The bounds are validated before any
    /// I/O happens.
    #[instrument(skip(self))]
    pub fn delete_values(
        &mut self,
        device_id: &str,
        stream_name: &str,
        from: &str,
        end: &str,
    ) -> Result<Status> {
        require_id("device id", device_id)?;
        require_id("stream name", stream_name)?;
        parse_timestamp(from).map_err(|_| {
            Error::InvalidArgument(format!("`from` is not an ISO-8601 timestamp: {from}"))
        })?;
        parse_timestamp(end).map_err(|_| {
            Error::InvalidArgument(format!("`end` is not an ISO-8601 timestamp: {end}"))
        })?;

        let body = json!({ "from": from, "end": end }).to_string();
        let path = format!(
            "/v2/devices/{}/streams/{}/values",
            encode_path_segment(device_id),
            encode_path_segment(stream_name)
        );
        self.status_cycle("DELETE", &path, Some(&body))
    }

    // =========================================================================
    // Location Operations
    // =========================================================================

    /// Update the device location.
    #[instrument(skip(self))]
    pub fn update_location(
        &mut self,
        device_id: &str,
        name: &str,
        latitude: f64,
        longitude: f64,
        elevation: f64,
    ) -> Result<Status> {
        require_id("device id", device_id)?;

        let body = json!({
            "name": name,
            "latitude": latitude,
            "longitude": longitude,
            "elevation": elevation
        })
        .to_string();
        let path = format!("/v2/devices/{}/location", encode_path_segment(device_id));
        self.status_cycle("PUT", &path, Some(&body))
    }

    /// Read the device's waypoint history, delivering each fix to
    /// `on_fix` as soon as it is parsed. Same body contract as
    /// [`StratusClient::list_stream_values`].
    #[instrument(skip(self, on_fix))]
    pub fn read_location<F>(&mut self, device_id: &str, mut on_fix: F) -> Result<Status>
    where
        F: FnMut(LocationFix),
    {
        require_id("device id", device_id)?;

        let path = format!("/v2/devices/{}/location", encode_path_segment(device_id));
        self.begin_cycle("GET", &path, None)?;
        let (timeout, poll, ci) = self.reader_params();
        let mut reader = ResponseReader::new(&mut self.transport, timeout, poll, ci);
        let outcome = Self::streamed_cycle(&mut reader, "waypoints", &mut on_fix);
        reader.close();
        outcome
    }

    // =========================================================================
    // Time Operations
    // =========================================================================

    /// Fetch the service's current epoch time in seconds.
    ///
    /// The 32-bit value stops being representable at the 2038 rollover;
    /// callers needing longevity should use [`StratusClient::time_millis`]
    /// with the 64-bit formatter instead.
    #[instrument(skip(self))]
    pub fn time_seconds(&mut self) -> Result<i32> {
        self.begin_cycle("GET", "/v2/time/seconds", None)?;
        let (timeout, poll, ci) = self.reader_params();
        let mut reader = ResponseReader::new(&mut self.transport, timeout, poll, ci);
        let outcome = Self::read_time_body(&mut reader);
        reader.close();
        outcome
    }

    /// Copy the service's current epoch time in milliseconds, as a
    /// decimal literal, into `buf`.
    ///
    /// `buf` needs the literal's length plus one byte; when it is too
    /// small the exact required capacity comes back in the error, so a
    /// zero-length probe learns the size in one round.
    #[instrument(skip(self, buf))]
    pub fn time_millis(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.begin_cycle("GET", "/v2/time/millis", None)?;
        let (timeout, poll, ci) = self.reader_params();
        let mut reader = ResponseReader::new(&mut self.transport, timeout, poll, ci);
        let outcome = Self::read_literal_body(&mut reader, buf);
        reader.close();
        outcome
    }

    // =========================================================================
    // Cycle Plumbing
    // =========================================================================

    /// Connect if needed and write the request. On a write failure the
    /// connection is released before the error surfaces.
    fn begin_cycle(&mut self, method: &str, path: &str, body: Option<&str>) -> Result<()> {
        if !self.transport.connected() {
            self.transport
                .connect(&self.config.host, self.config.port)?;
        }
        if let Err(err) = write_request(&mut self.transport, &self.config, method, path, body) {
            self.transport.stop();
            return Err(err);
        }
        Ok(())
    }

    fn reader_params(&self) -> (std::time::Duration, std::time::Duration, bool) {
        (
            self.config.read_timeout(),
            self.config.poll_interval(),
            self.config.case_insensitive,
        )
    }

    /// Run a cycle whose response body is ignored: the HTTP status is the
    /// whole result.
    fn status_cycle(&mut self, method: &str, path: &str, body: Option<&str>) -> Result<Status> {
        self.begin_cycle(method, path, body)?;
        let (timeout, poll, ci) = self.reader_params();
        let mut reader = ResponseReader::new(&mut self.transport, timeout, poll, ci);
        let status = reader.read_status();
        reader.close();
        status
    }

    /// Shared tail of the record-streaming cycles.
    fn streamed_cycle<Rec, F>(
        reader: &mut ResponseReader<'_, T>,
        key: &'static str,
        consumer: &mut F,
    ) -> Result<Status>
    where
        Rec: DeserializeOwned,
        F: FnMut(Rec),
    {
        let status = reader.read_status()?;
        if !status.is_success() {
            debug!(%status, "non-success response; body not parsed");
            return Ok(status);
        }
        let content_length = reader.scan_headers()?;
        if content_length.is_some() {
            // scan returned early; the rest of the header block is pending
            reader.skip_to_body()?;
        }

        let body = reader.body_reader(content_length);
        match extract_records(body, key, consumer) {
            Ok(count) => {
                debug!(count, "records delivered");
                Ok(status)
            }
            Err(parse_err) => match reader.take_body_error() {
                Some(err) => Err(err),
                None => {
                    debug!(error = %parse_err, "response body rejected");
                    Err(Error::JsonInvalid)
                }
            },
        }
    }

    /// Parse a decimal epoch-seconds literal out of the body.
    fn read_time_body(reader: &mut ResponseReader<'_, T>) -> Result<i32> {
        let status = reader.read_status()?;
        if !status.is_success() {
            return Err(Error::Http(status));
        }
        let content_length = reader.scan_headers()?;
        if content_length.is_some() {
            reader.skip_to_body()?;
        }

        let mut raw = [0u8; 16];
        let mut len = 0;
        {
            use std::io::Read;
            let mut body = reader.body_reader(content_length);
            loop {
                if len == raw.len() {
                    // far longer than any epoch-seconds literal
                    return Err(Error::JsonInvalid);
                }
                match body.read(&mut raw[len..]) {
                    Ok(0) => break,
                    Ok(n) => len += n,
                    Err(_) => break, // recorded on the reader
                }
            }
        }
        if let Some(err) = reader.take_body_error() {
            return Err(err);
        }

        let text = std::str::from_utf8(&raw[..len]).map_err(|_| Error::JsonInvalid)?;
        text.trim().parse::<i32>().map_err(|_| Error::JsonInvalid)
    }

    /// Copy a content-length-delimited literal body into `buf`.
    fn read_literal_body(reader: &mut ResponseReader<'_, T>, buf: &mut [u8]) -> Result<usize> {
        let status = reader.read_status()?;
        if !status.is_success() {
            return Err(Error::Http(status));
        }
        let Some(content_length) = reader.scan_headers()? else {
            // the time endpoints always declare a length; its absence
            // breaks the body contract
            return Err(Error::JsonInvalid);
        };
        reader.skip_to_body()?;
        reader.read_body_into(content_length, buf)
    }
}

fn require_id(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}
