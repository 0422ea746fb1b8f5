//! Firmware integrity pinning
//!
//! The first firmware hash seen for a sensor becomes its pin. Later uploads
//! must match the pin; a differing hash is flagged as an injection attempt.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareDecision {
    /// First sighting; the hash is now the sensor's pin.
    Pinned,
    /// Upload matches the pinned hash.
    Verified,
    /// Upload differs from the pinned hash.
    Mismatch,
}

#[derive(Default)]
pub struct FirmwarePins {
    pins: HashMap<String, String>,
}

impl FirmwarePins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verify(&mut self, sensor_id: &str, hash: &str) -> FirmwareDecision {
        match self.pins.get(sensor_id) {
            None => {
                self.pins.insert(sensor_id.to_string(), hash.to_string());
                FirmwareDecision::Pinned
            }
            Some(pinned) if pinned == hash => FirmwareDecision::Verified,
            Some(_) => FirmwareDecision::Mismatch,
        }
    }

    pub fn reset(&mut self, sensor_id: &str) {
        self.pins.remove(sensor_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_upload_pins_then_verifies() {
        let mut pins = FirmwarePins::new();
        assert_eq!(pins.verify("soil-1000", "aaa"), FirmwareDecision::Pinned);
        assert_eq!(pins.verify("soil-1000", "aaa"), FirmwareDecision::Verified);
        assert_eq!(pins.verify("soil-1000", "bbb"), FirmwareDecision::Mismatch);
    }

    #[test]
    fn mismatch_does_not_replace_the_pin() {
        let mut pins = FirmwarePins::new();
        pins.verify("soil-1000", "aaa");
        pins.verify("soil-1000", "bbb");
        assert_eq!(pins.verify("soil-1000", "aaa"), FirmwareDecision::Verified);
    }

    #[test]
    fn reset_allows_repinning() {
        let mut pins = FirmwarePins::new();
        pins.verify("soil-1000", "aaa");
        pins.reset("soil-1000");
        assert_eq!(pins.verify("soil-1000", "bbb"), FirmwareDecision::Pinned);
    }

    #[test]
    fn pins_are_per_sensor() {
        let mut pins = FirmwarePins::new();
        pins.verify("soil-1000", "aaa");
        assert_eq!(pins.verify("water-3000", "bbb"), FirmwareDecision::Pinned);
    }
}
