//! Contains device specific handling code and the trait definition for talking to the monitor.
use std::time::Duration;

use log::warn;
use thiserror::Error;

use crate::packet::RawReport;
use crate::{FEATURE_REPORT, PID, REPORT_LEN, VID};

/// Failures while talking to the monitor. All of them end the watch loop; a timeout is not one of them,
/// see [`ReadOutcome::TimedOut`].
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No HID device with the monitor's vendor and product ID is connected.
    #[error("no CO2 monitor {vid:04x}:{pid:04x} found, is it connected to this computer?")]
    DeviceNotFound { vid: u16, pid: u16 },
    /// The device is there but could not be opened or armed, usually missing permissions.
    #[error("unable to open the CO2 monitor (do you have sufficient permissions?): {0}")]
    DeviceOpen(String),
    /// Something during the read failed, e.g. the monitor was unplugged.
    #[error("could not read the CO2 monitor, check that it is correctly plugged: {0}")]
    ReadFailed(String),
}

/// The result of a single bounded read.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Report(RawReport),
    /// Nothing arrived within the timeout. The monitor only sends every few seconds, so this is expected.
    TimedOut,
    /// Fewer bytes than a full report arrived.
    Incomplete(usize),
}

/// Implement this trait for your struct that handles talking over USB-HID. See `pc.rs` for an implementation
/// that uses the hidapi rust crate.
pub trait Co2MonitorCommunication {
    /// Create your managing struct, connect to the monitor and send the [`feature_report`] so it starts
    /// streaming.
    ///
    /// [`feature_report`]: Co2MonitorCommunication::feature_report
    fn open() -> Result<Self, MonitorError>
    where
        Self: Sized;

    /// This rarely needs to be called directly, use `read_report` instead.
    /// It should block for at most `timeout` and read a single HID report to the `read_buffer`, returning the
    /// number of bytes read. Zero bytes means the timeout elapsed.
    fn read(
        &mut self,
        read_buffer: &mut [u8; REPORT_LEN],
        timeout: Duration,
    ) -> Result<usize, MonitorError>;

    /// Release the connection. Calling this more than once must be harmless.
    fn close(&mut self);

    fn feature_report() -> &'static [u8]
    where
        Self: Sized,
    {
        &FEATURE_REPORT
    }

    /// The vendor ID of the monitor.
    fn vid() -> u16
    where
        Self: Sized,
    {
        VID
    }

    /// The product ID of the monitor.
    fn pid() -> u16
    where
        Self: Sized,
    {
        PID
    }

    /// Read a single report, waiting at most `timeout`.
    fn read_report(&mut self, timeout: Duration) -> Result<ReadOutcome, MonitorError> {
        let mut read_buffer = [0u8; REPORT_LEN];
        match self.read(&mut read_buffer, timeout)? {
            0 => Ok(ReadOutcome::TimedOut),
            REPORT_LEN => {
                let report = RawReport::from(read_buffer);
                if !report.has_terminator() || !report.checksum_ok() {
                    warn!(
                        "report {:02x?} has a bad checksum or terminator, decoding anyway",
                        report.bytes()
                    );
                }
                Ok(ReadOutcome::Report(report))
            }
            n => Ok(ReadOutcome::Incomplete(n)),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A scripted monitor for exercising the read path without hardware.
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;

    pub enum Step {
        Bytes(Vec<u8>),
        Timeout,
        Fail,
    }

    /// What the scripted monitor was asked to do.
    #[derive(Debug, Default)]
    pub struct Log {
        pub reads: usize,
        pub closes: usize,
    }

    pub struct ScriptedMonitor {
        steps: VecDeque<Step>,
        log: Rc<RefCell<Log>>,
        endless_timeouts: bool,
    }

    impl ScriptedMonitor {
        pub fn new(steps: impl IntoIterator<Item = Step>) -> (Self, Rc<RefCell<Log>>) {
            let log = Rc::new(RefCell::new(Log::default()));
            let monitor = Self {
                steps: steps.into_iter().collect(),
                log: Rc::clone(&log),
                endless_timeouts: false,
            };
            (monitor, log)
        }

        /// Once the script is used up, keep timing out instead of failing.
        pub fn timing_out_forever(mut self) -> Self {
            self.endless_timeouts = true;
            self
        }
    }

    pub fn report(key: u8, value: u16) -> Step {
        let [hi, lo] = value.to_be_bytes();
        let checksum = key.wrapping_add(hi).wrapping_add(lo);
        Step::Bytes(vec![key, hi, lo, checksum, 0x0d, 0, 0, 0])
    }

    impl Co2MonitorCommunication for ScriptedMonitor {
        fn open() -> Result<Self, MonitorError> {
            Err(MonitorError::DeviceNotFound {
                vid: Self::vid(),
                pid: Self::pid(),
            })
        }

        fn read(
            &mut self,
            read_buffer: &mut [u8; REPORT_LEN],
            _timeout: Duration,
        ) -> Result<usize, MonitorError> {
            self.log.borrow_mut().reads += 1;
            match self.steps.pop_front() {
                Some(Step::Bytes(bytes)) => {
                    read_buffer[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Step::Timeout) => Ok(0),
                None if self.endless_timeouts => Ok(0),
                Some(Step::Fail) | None => {
                    Err(MonitorError::ReadFailed("device unplugged".to_owned()))
                }
            }
        }

        fn close(&mut self) {
            self.log.borrow_mut().closes += 1;
        }
    }
}
