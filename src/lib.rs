//! Read the ZyAura based USB CO2 monitors (vendor `04d9`, product `a052`, sold e.g. as AirCO2ntrol Mini or
//! TFA Dostmann) and hand every complete reading to a list of registered watchers.
//!
//! The device streams 8-byte HID reports, each carrying a single tagged value. A CO2 value and a temperature
//! value arrive in separate reports, so a full reading is assembled from several reports:
//!
//! * [`packet`] decodes a single report into a [`packet::DecodedField`].
//! * [`assembler`] combines decoded fields into a [`MonitorReading`].
//! * [`device`] defines how to talk to the monitor, [`pc`] implements that with the `hidapi` crate.
//! * [`watch`] drives the loop: read, assemble, dispatch to watchers, sleep, repeat until cancelled.
pub mod assembler;
pub mod cancel;
pub mod device;
pub mod packet;
#[cfg(feature = "pc")]
pub mod pc;
pub mod trend;
pub mod watch;

pub use assembler::ReadingAssembler;
pub use cancel::CancelToken;
pub use device::{Co2MonitorCommunication, MonitorError, ReadOutcome};
pub use packet::{DecodedField, RawReport};
pub use watch::{Reading, Watch, WatchConfig, WatchError, Watcher, WatcherError};

/// Vendor ID of the monitor. Not configurable, every unit of this model reports the same one.
pub const VID: u16 = 0x04d9;
/// Product ID of the monitor.
pub const PID: u16 = 0xa052;

/// Every input report of the monitor is exactly this long.
pub const REPORT_LEN: usize = 8;

/// Report ID 0 followed by a single zero byte. Other tools send a key table here, but the monitor switches
/// to streaming mode with zeroes just as well. Without it no HID data will be available.
pub const FEATURE_REPORT: [u8; 2] = [0x00, 0x00];

/// The highest CO2 concentration the sensor is specified for. Values above are passed through untouched,
/// see [`trend::Co2Level`] for how a consumer may interpret them.
pub const SENSOR_MAX_CO2_PPM: u16 = 3000;

/// A complete CO2 + temperature pair, as produced by the [`ReadingAssembler`]. It carries no timestamp, the
/// watch loop stamps it when handing it out as a [`Reading`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MonitorReading {
    pub co2_ppm: u16,
    pub temperature: f32,
}

impl core::fmt::Display for MonitorReading {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "T:{:.1} Co2:{}", self.temperature, self.co2_ppm)
    }
}
