//! Reading drift scan
//!
//! Flags points in a short value series that sit far outside the rest of the
//! series. Each point is scored against the mean and standard deviation of
//! the *other* points, so a single large excursion cannot hide by inflating
//! the baseline it is compared to.

/// Minimum series length before a verdict is attempted.
pub const MIN_SAMPLES: usize = 5;

/// Absolute deviation tolerated when the rest of the series is flat
/// (sensor units). With a flat baseline the z-score degenerates, so the
/// reported score is expressed in multiples of this band instead.
const FLAT_BAND: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftDecision {
    /// Not enough samples for a meaningful scan.
    Insufficient { have: usize, need: usize },
    /// Every point sits inside the threshold.
    Stable { mean: f64 },
    /// `value` at `index` deviates by `score` (z-score, or band multiples
    /// over a flat baseline).
    Outlier { index: usize, value: f64, score: f64 },
}

pub fn scan(values: &[f64], z_threshold: f64) -> DriftDecision {
    if values.len() < MIN_SAMPLES {
        return DriftDecision::Insufficient {
            have: values.len(),
            need: MIN_SAMPLES,
        };
    }

    for (index, &value) in values.iter().enumerate() {
        let rest: Vec<f64> = values
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != index)
            .map(|(_, &v)| v)
            .collect();

        let mean = rest.iter().sum::<f64>() / rest.len() as f64;
        let variance = rest.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / rest.len() as f64;
        let std_dev = variance.sqrt();

        let score = if std_dev > f64::EPSILON {
            (value - mean).abs() / std_dev
        } else {
            (value - mean).abs() / FLAT_BAND
        };

        if score > z_threshold {
            return DriftDecision::Outlier { index, value, score };
        }
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    DriftDecision::Stable { mean }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_is_inconclusive() {
        assert_eq!(
            scan(&[22.0, 22.1], 3.0),
            DriftDecision::Insufficient { have: 2, need: MIN_SAMPLES }
        );
    }

    #[test]
    fn steady_readings_are_stable() {
        let values = [22.0, 22.5, 21.8, 22.1, 21.9, 22.2, 22.4, 21.7];
        assert!(matches!(scan(&values, 3.0), DriftDecision::Stable { .. }));
    }

    #[test]
    fn single_excursion_is_flagged() {
        let values = [22.0, 22.5, 21.8, 22.1, 21.9, 22.2, 48.0, 21.7];
        match scan(&values, 3.0) {
            DriftDecision::Outlier { index, value, .. } => {
                assert_eq!(index, 6);
                assert!((value - 48.0).abs() < f64::EPSILON);
            }
            other => panic!("expected outlier, got {:?}", other),
        }
    }

    #[test]
    fn excursion_over_flat_baseline_is_flagged() {
        let values = [22.0, 22.0, 22.0, 22.0, 22.0, 30.0];
        assert!(matches!(scan(&values, 3.0), DriftDecision::Outlier { index: 5, .. }));
    }

    #[test]
    fn identical_values_are_stable() {
        let values = [22.0; 6];
        assert!(matches!(scan(&values, 3.0), DriftDecision::Stable { .. }));
    }
}
