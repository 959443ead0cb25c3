//! Interpretation of CO2 values for display: a coarse air quality level and a rolling window of recent values.
use heapless::Deque;

use crate::SENSOR_MAX_CO2_PPM;
use crate::watch::{Reading, Watcher, WatcherError};

const ELEVATED_THRESHOLD: u16 = 800;
const HIGH_THRESHOLD: u16 = 1200;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Co2Level {
    Good,
    Elevated,
    High,
    /// Above what the sensor is specified for. The value itself is unreliable, the display usually shows "HI".
    OutOfRange,
}

impl Co2Level {
    pub fn classify(co2_ppm: u16) -> Self {
        match co2_ppm {
            ppm if ppm > SENSOR_MAX_CO2_PPM => Co2Level::OutOfRange,
            ppm if ppm >= HIGH_THRESHOLD => Co2Level::High,
            ppm if ppm >= ELEVATED_THRESHOLD => Co2Level::Elevated,
            _ => Co2Level::Good,
        }
    }
}

impl core::fmt::Display for Co2Level {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Co2Level::Good => "good",
            Co2Level::Elevated => "elevated",
            Co2Level::High => "high",
            Co2Level::OutOfRange => "too high",
        })
    }
}

/// The last `N` CO2 values. Older values are dropped as new ones arrive.
#[derive(Clone, Debug)]
pub struct Co2Window<const N: usize> {
    values: Deque<u16, N>,
}

impl<const N: usize> Co2Window<N> {
    pub fn new() -> Self {
        Self {
            values: Deque::new(),
        }
    }

    pub fn push(&mut self, co2_ppm: u16) {
        if self.values.is_full() {
            self.values.pop_front();
        }
        // Cannot fail, there is room after the pop above.
        let _ = self.values.push_back(co2_ppm);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest(&self) -> Option<u16> {
        self.values.back().copied()
    }

    pub fn min(&self) -> Option<u16> {
        self.values.iter().copied().min()
    }

    pub fn max(&self) -> Option<u16> {
        self.values.iter().copied().max()
    }

    pub fn mean(&self) -> Option<f32> {
        if self.values.is_empty() {
            return None;
        }
        let sum: u32 = self.values.iter().map(|&v| u32::from(v)).sum();
        Some(sum as f32 / self.values.len() as f32)
    }

    pub fn level(&self) -> Option<Co2Level> {
        self.latest().map(Co2Level::classify)
    }
}

impl<const N: usize> Default for Co2Window<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Watcher for Co2Window<N> {
    fn on_reading(&mut self, reading: &Reading) -> Result<(), WatcherError> {
        self.push(reading.co2_ppm);
        Ok(())
    }
}
