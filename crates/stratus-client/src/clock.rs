//! Drift-corrected wall-clock service
//!
//! Reconstructs wall-clock time from a single absolute reference fetched
//! from the service plus the local millisecond tick counter, so a device
//! can stamp records without querying the network for every timestamp.
//! The tick counter is 32 bits and wraps every ~49.7 days; a wrap is
//! detected and absorbed by transparently re-running the sync exchange.

use std::time::Instant;

use stratus_core::time::{format_timestamp, TIMESTAMP_BUFFER_LEN};
use tracing::{debug, instrument, warn};

use crate::client::StratusClient;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Monotonically increasing local millisecond counter, wrapping at
/// `u32::MAX` like a 32-bit hardware tick register.
pub trait TickSource {
    fn millis(&mut self) -> u32;
}

/// Tick source over [`std::time::Instant`], counted from construction.
#[derive(Debug)]
pub struct SystemTickSource {
    origin: Instant,
}

impl SystemTickSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTickSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for SystemTickSource {
    fn millis(&mut self) -> u32 {
        // truncation wraps exactly like the hardware counter would
        self.origin.elapsed().as_millis() as u32
    }
}

/// The synchronized reference point between server time and local ticks.
#[derive(Debug, Clone, Copy)]
struct ClockState {
    server_seconds: i32,
    tick_at_sync: u32,
}

/// ISO-8601 timestamp service synchronized against the service's time
/// endpoint.
///
/// Starts unsynced; [`ClockService::init`] performs the network exchange
/// that makes [`ClockService::get_timestamp`] usable. The reference is
/// only ever advanced forward, except by a fresh network sync.
#[derive(Debug)]
pub struct ClockService<C: TickSource> {
    ticks: C,
    state: Option<ClockState>,
}

impl<C: TickSource> ClockService<C> {
    pub fn new(ticks: C) -> Self {
        Self { ticks, state: None }
    }

    pub fn is_synced(&self) -> bool {
        self.state.is_some()
    }

    /// Fetch the absolute reference and enter the synced state.
    ///
    /// A failed exchange leaves the previous state untouched and
    /// propagates the error unchanged.
    #[instrument(skip_all)]
    pub fn init<T: Transport>(&mut self, client: &mut StratusClient<T>) -> Result<()> {
        self.reset(client)
    }

    /// Re-run the sync exchange. Called automatically when the tick
    /// counter is observed to have wrapped; manual calls are never needed
    /// for correctness.
    pub fn reset<T: Transport>(&mut self, client: &mut StratusClient<T>) -> Result<()> {
        let server_seconds = client.time_seconds()?;
        let tick_at_sync = self.ticks.millis();
        self.state = Some(ClockState {
            server_seconds,
            tick_at_sync,
        });
        debug!(server_seconds, tick_at_sync, "clock synchronized");
        Ok(())
    }

    /// Format the current wall-clock time as `YYYY-MM-DDTHH:MM:SS.mmmZ`
    /// into `buf`, returning the number of visible characters written.
    ///
    /// `buf` must hold at least [`TIMESTAMP_BUFFER_LEN`] bytes (the 24
    /// visible characters plus a NUL terminator); a smaller buffer fails
    /// with the exact required capacity before anything else is checked,
    /// so a caller can size a retry from the error alone.
    #[instrument(skip_all)]
    pub fn get_timestamp<T: Transport>(
        &mut self,
        client: &mut StratusClient<T>,
        buf: &mut [u8],
    ) -> Result<usize> {
        if buf.len() < TIMESTAMP_BUFFER_LEN {
            return Err(Error::BufferTooSmall {
                required: TIMESTAMP_BUFFER_LEN,
            });
        }
        let synced = self
            .state
            .ok_or_else(|| Error::InvalidArgument("clock service not initialized".to_string()))?;

        let mut now = self.ticks.millis();
        if now < synced.tick_at_sync {
            // the tick counter wrapped; refresh the absolute reference
            warn!(
                tick = now,
                tick_at_sync = synced.tick_at_sync,
                "tick source wrapped, re-syncing"
            );
            self.reset(client)?;
            now = self.ticks.millis();
        }

        let Some(state) = self.state.as_mut() else {
            return Err(Error::TimestampError);
        };
        if now < state.tick_at_sync {
            // a fresh sync cannot leave the tick behind; something other
            // than a wrap is wrong with the tick source
            return Err(Error::TimestampError);
        }

        let elapsed = now - state.tick_at_sync;
        state.tick_at_sync = now;
        state.server_seconds += (elapsed / 1000) as i32;

        let seconds = state.server_seconds;
        let millis = elapsed % 1000;
        Ok(format_timestamp(seconds, millis, buf)?)
    }
}
