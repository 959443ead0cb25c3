//! Decoding of single HID input reports.
//!
//! Byte 0 of a report is the op-code, bytes 1 and 2 a big-endian value. Byte 3 is a checksum over bytes
//! 0..3 and byte 4 should be the terminator `0x0d`. The monitor is trusted: checksum and terminator are only
//! inspected for logging, and values are never range checked.
use crate::REPORT_LEN;

const OPCODE_TEMPERATURE: u8 = 0x42;
const OPCODE_CO2_VALUE: u8 = 0x50;
const TERMINATOR: u8 = 0x0d;

/// One raw 8-byte input report as read from the monitor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawReport([u8; REPORT_LEN]);

impl RawReport {
    pub fn new(bytes: [u8; REPORT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }

    pub fn key(&self) -> u8 {
        self.0[0]
    }

    pub fn value(&self) -> u16 {
        u16::from_be_bytes([self.0[1], self.0[2]])
    }

    /// Bytes 0, 1 and 2 sum to byte 3 (in the lowest byte).
    pub fn checksum_ok(&self) -> bool {
        self.0[0].wrapping_add(self.0[1]).wrapping_add(self.0[2]) == self.0[3]
    }

    pub fn has_terminator(&self) -> bool {
        self.0[4] == TERMINATOR
    }

    pub fn decode(&self) -> DecodedField {
        decode(self)
    }
}

impl From<[u8; REPORT_LEN]> for RawReport {
    fn from(bytes: [u8; REPORT_LEN]) -> Self {
        Self::new(bytes)
    }
}

/// The typed content of a single report.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodedField {
    /// CO2 concentration in ppm.
    Co2(u16),
    /// Temperature in 1/16 Kelvin. See [`kelvin16_to_celsius`].
    Temperature(u16),
    /// The monitor sends a handful of other op-codes (e.g. `0x6e`, `0x41`) that are of no interest here.
    Unknown { key: u8, value: u16 },
}

pub fn decode(report: &RawReport) -> DecodedField {
    let value = report.value();
    match report.key() {
        OPCODE_CO2_VALUE => DecodedField::Co2(value),
        OPCODE_TEMPERATURE => DecodedField::Temperature(value),
        key => DecodedField::Unknown { key, value },
    }
}

/// The monitor reports temperature in steps of 1/16 Kelvin.
pub fn kelvin16_to_celsius(raw: u16) -> f32 {
    let temperature_in_kelvin = (raw as f32) / 16.0;
    temperature_in_kelvin - 273.15
}
