//! Combines decoded fields from consecutive reports into complete readings.
use crate::MonitorReading;
use crate::packet::{DecodedField, kelvin16_to_celsius};

/// Holds the CO2 and temperature values seen since the last complete reading.
///
/// Each slot keeps the most recent value of its kind. If the monitor sends two CO2 reports before a
/// temperature report, the newer CO2 value wins. The two values of a reading therefore come from the two most
/// recent reports of each kind, not from a single synchronized sample; the protocol offers nothing better.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ReadingAssembler {
    co2_value: Option<u16>,
    temperature: Option<f32>,
}

impl ReadingAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded field. Returns a reading once both slots are filled, and empties them again.
    pub fn push(&mut self, field: DecodedField) -> Option<MonitorReading> {
        match field {
            DecodedField::Co2(val) => self.co2_value = Some(val),
            DecodedField::Temperature(val) => self.temperature = Some(kelvin16_to_celsius(val)),
            DecodedField::Unknown { .. } => return None,
        }

        if let (Some(co2_ppm), Some(temperature)) = (self.co2_value, self.temperature) {
            self.reset();
            return Some(MonitorReading {
                co2_ppm,
                temperature,
            });
        }
        None
    }

    /// Drop whatever partial state has been collected.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.co2_value.is_none() && self.temperature.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T_20_85: DecodedField = DecodedField::Temperature(4688);

    #[test]
    fn needs_both_fields() {
        let mut assembler = ReadingAssembler::new();
        assert_eq!(assembler.push(DecodedField::Co2(600)), None);
        assert!(!assembler.is_empty());

        let reading = assembler.push(T_20_85).unwrap();
        assert_eq!(reading.co2_ppm, 600);
        assert!((reading.temperature - 19.85).abs() < 1e-3);
        assert!(assembler.is_empty());
    }

    #[test]
    fn order_does_not_matter() {
        let mut assembler = ReadingAssembler::new();
        assert_eq!(assembler.push(T_20_85), None);
        let reading = assembler.push(DecodedField::Co2(420)).unwrap();
        assert_eq!(reading.co2_ppm, 420);
    }

    #[test]
    fn same_pair_twice_yields_two_readings() {
        let mut assembler = ReadingAssembler::new();
        let mut readings = 0;
        for _ in 0..2 {
            for field in [DecodedField::Co2(500), T_20_85] {
                if assembler.push(field).is_some() {
                    readings += 1;
                }
            }
        }
        assert_eq!(readings, 2);
    }

    #[test]
    fn newest_co2_wins() {
        let mut assembler = ReadingAssembler::new();
        assert_eq!(assembler.push(DecodedField::Co2(500)), None);
        assert_eq!(assembler.push(DecodedField::Co2(900)), None);
        assert_eq!(assembler.push(T_20_85).unwrap().co2_ppm, 900);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let mut assembler = ReadingAssembler::new();
        let unknown = DecodedField::Unknown {
            key: 0x6e,
            value: 0x1234,
        };
        assert_eq!(assembler.push(unknown), None);
        assert!(assembler.is_empty());
        assert_eq!(assembler.push(DecodedField::Co2(700)), None);
        assert_eq!(assembler.push(unknown), None);
        assert!(assembler.push(T_20_85).is_some());
    }

    #[test]
    fn never_more_readings_than_either_field() {
        let stream = [
            DecodedField::Co2(400),
            DecodedField::Co2(410),
            T_20_85,
            DecodedField::Unknown { key: 0x41, value: 1 },
            T_20_85,
            T_20_85,
            DecodedField::Co2(420),
            DecodedField::Co2(430),
            T_20_85,
        ];
        let mut assembler = ReadingAssembler::new();
        let (mut co2, mut temperature, mut readings) = (0, 0, 0);
        for field in stream {
            match field {
                DecodedField::Co2(_) => co2 += 1,
                DecodedField::Temperature(_) => temperature += 1,
                DecodedField::Unknown { .. } => (),
            }
            if assembler.push(field).is_some() {
                readings += 1;
            }
            assert!(readings <= co2.min(temperature));
        }
        assert_eq!(readings, 3);
    }

    #[test]
    fn reset_discards_partial_state() {
        let mut assembler = ReadingAssembler::new();
        assembler.push(DecodedField::Co2(800));
        assembler.reset();
        assert_eq!(assembler.push(T_20_85), None);
    }
}
