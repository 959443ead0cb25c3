//! The watch loop: acquire a reading, hand it to every registered watcher, sleep, repeat.
use std::error::Error as StdError;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::MonitorReading;
use crate::assembler::ReadingAssembler;
use crate::cancel::CancelToken;
use crate::device::{Co2MonitorCommunication, MonitorError, ReadOutcome};

/// Blocking reads are issued in slices of at most this long, so a cancellation is noticed quickly.
const CANCEL_CHECK_INTERVAL: Duration = Duration::from_millis(200);

pub type WatcherError = Box<dyn StdError + Send + Sync>;

/// A complete reading, stamped with the time the second of its two fields arrived.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Local>,
    pub co2_ppm: u16,
    pub temperature_celsius: f32,
}

impl Reading {
    pub fn new(timestamp: DateTime<Local>, reading: MonitorReading) -> Self {
        Self {
            timestamp,
            co2_ppm: reading.co2_ppm,
            temperature_celsius: reading.temperature,
        }
    }

    /// Seconds since the Unix epoch, with sub-second precision.
    pub fn epoch_seconds(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1e6
    }
}

/// Gets called once per completed reading. Returning an error stops the watch loop.
///
/// Closures taking `(timestamp, co2_ppm, temperature_celsius)` are watchers too.
pub trait Watcher {
    fn on_reading(&mut self, reading: &Reading) -> Result<(), WatcherError>;
}

impl<F> Watcher for F
where
    F: FnMut(DateTime<Local>, u16, f32) -> Result<(), WatcherError>,
{
    fn on_reading(&mut self, reading: &Reading) -> Result<(), WatcherError> {
        self(
            reading.timestamp,
            reading.co2_ppm,
            reading.temperature_celsius,
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WatchConfig {
    /// Pause between two acquisitions.
    pub interval: Duration,
    /// How long to wait for a report before logging a timeout and trying again.
    pub read_timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
        }
    }
}

impl WatchConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// The read timeout actually used: never shorter than one read slice, so a zero timeout does not expire
    /// on every slice.
    pub fn effective_read_timeout(&self) -> Duration {
        self.read_timeout.max(CANCEL_CHECK_INTERVAL)
    }
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Device(#[from] MonitorError),
    /// A watcher failed. The loop does not swallow these, a broken consumer should be noticed.
    #[error("watcher #{index} failed: {source}")]
    Watcher {
        index: usize,
        #[source]
        source: WatcherError,
    },
}

/// Owns the monitor connection and the list of watchers.
pub struct Watch<M: Co2MonitorCommunication> {
    monitor: M,
    config: WatchConfig,
    watchers: Vec<Box<dyn Watcher>>,
    assembler: ReadingAssembler,
    cancel: CancelToken,
}

impl<M: Co2MonitorCommunication> Watch<M> {
    pub fn new(monitor: M, config: WatchConfig) -> Self {
        Self {
            monitor,
            config,
            watchers: Vec::new(),
            assembler: ReadingAssembler::new(),
            cancel: CancelToken::new(),
        }
    }

    /// A handle that stops [`run`](Watch::run) from any thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Watchers are called in the order they were registered.
    pub fn register<W: Watcher + 'static>(&mut self, watcher: W) {
        self.watchers.push(Box::new(watcher));
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    /// Read reports until a full reading is assembled. Timeouts are retried for as long as it takes.
    /// Returns `Ok(None)` if cancelled before a reading was complete.
    pub fn next_reading(&mut self) -> Result<Option<Reading>, MonitorError> {
        let read_timeout = self.config.effective_read_timeout();
        let mut deadline = Instant::now() + read_timeout;
        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            let slice = deadline
                .saturating_duration_since(Instant::now())
                .clamp(Duration::from_millis(1), CANCEL_CHECK_INTERVAL);

            match self.monitor.read_report(slice)? {
                ReadOutcome::Report(report) => {
                    deadline = Instant::now() + read_timeout;
                    let field = report.decode();
                    trace!("decoded {field:?}");
                    if let Some(reading) = self.assembler.push(field) {
                        let reading = Reading::new(Local::now(), reading);
                        debug!("reading complete: {reading:?}");
                        return Ok(Some(reading));
                    }
                }
                ReadOutcome::TimedOut => {
                    if Instant::now() >= deadline {
                        debug!("no report within {read_timeout:?}, retrying");
                        deadline = Instant::now() + read_timeout;
                    }
                }
                ReadOutcome::Incomplete(n) => {
                    warn!("got {n} bytes instead of a full report, skipping");
                }
            }
        }
    }

    fn dispatch(&mut self, reading: &Reading) -> Result<(), WatchError> {
        for (index, watcher) in self.watchers.iter_mut().enumerate() {
            watcher
                .on_reading(reading)
                .map_err(|source| WatchError::Watcher { index, source })?;
        }
        Ok(())
    }

    fn watch_until_cancelled(&mut self) -> Result<(), WatchError> {
        loop {
            let Some(reading) = self.next_reading()? else {
                return Ok(());
            };
            self.dispatch(&reading)?;
            if self.cancel.sleep(self.config.interval) {
                return Ok(());
            }
        }
    }

    /// Watch the monitor until cancelled. The connection is closed exactly once, however the loop ends.
    /// Cancellation is a normal end and gives `Ok(())`; a read error or a failing watcher is returned.
    pub fn run(mut self) -> Result<(), WatchError> {
        info!(
            "watching every {:?} with {} watcher(s)",
            self.config.interval,
            self.watchers.len()
        );
        let result = self.watch_until_cancelled();
        info!("closing the CO2 monitor");
        self.monitor.close();
        result
    }
}
