//! Side-channel timing check
//!
//! Crypto operations on healthy devices complete inside a narrow timing
//! band. A measurement outside the band is treated as a possible probe.

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct TimingBand {
    pub min_us: u64,
    pub max_us: u64,
}

impl TimingBand {
    pub fn contains(&self, duration_us: u64) -> bool {
        duration_us >= self.min_us && duration_us <= self.max_us
    }
}

/// Simulated crypto-op duration used when a request carries no measurement.
pub fn sample_crypto_timing() -> u64 {
    rand::thread_rng().gen_range(50..=200)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_is_inclusive() {
        let band = TimingBand { min_us: 80, max_us: 120 };
        assert!(band.contains(80));
        assert!(band.contains(120));
        assert!(!band.contains(79));
        assert!(!band.contains(121));
    }

    #[test]
    fn samples_stay_in_simulated_range() {
        for _ in 0..100 {
            let us = sample_crypto_timing();
            assert!((50..=200).contains(&us));
        }
    }
}
