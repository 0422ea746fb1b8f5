//! Telemetry simulation
//!
//! Generates plausible readings per sensor class and refreshes the store on
//! a fixed interval. Sensor ids are index-stable across refreshes
//! (`soil-1000`..`soil-1004`, `atm-2000`.., and so on), so the live id set
//! doubles as the hijack whitelist.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;

use crate::models::{SensorClass, SensorMetrics, SensorReading};
use crate::store::GatewayStore;

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// One fresh reading for the class at the given batch index.
pub fn generate(class: SensorClass, index: usize) -> SensorReading {
    let mut rng = rand::thread_rng();

    let metrics = match class {
        SensorClass::Soil => SensorMetrics::Soil {
            temperature: round2(rng.gen_range(15.0..30.0)),
            moisture: round2(rng.gen_range(20.0..70.0)),
            ph: round2(rng.gen_range(5.0..7.5)),
            nutrient_level: round2(rng.gen_range(1.0..5.0)),
        },
        SensorClass::Water => SensorMetrics::Water {
            flow_rate: round2(rng.gen_range(1.0..10.0)),
            water_level: round2(rng.gen_range(50.0..200.0)),
            salinity: round2(rng.gen_range(0.1..5.0)),
            ph: round2(rng.gen_range(6.0..8.0)),
            turbidity: round2(rng.gen_range(1.0..10.0)),
        },
        SensorClass::Atmospheric => SensorMetrics::Atmospheric {
            air_temperature: round2(rng.gen_range(10.0..35.0)),
            humidity: round2(rng.gen_range(30.0..90.0)),
            co2: round2(rng.gen_range(300.0..700.0)),
            wind_speed: round2(rng.gen_range(0.0..15.0)),
            rainfall: round2(rng.gen_range(0.0..50.0)),
        },
        SensorClass::Plant => SensorMetrics::Plant {
            leaf_moisture: round2(rng.gen_range(30.0..80.0)),
            chlorophyll_level: round2(rng.gen_range(1.0..5.0)),
            growth_rate: round2(rng.gen_range(0.5..3.0)),
            disease_risk: round2(rng.gen_range(0.0..1.0)),
            stem_diameter: round2(rng.gen_range(0.5..2.0)),
        },
        SensorClass::Threat => SensorMetrics::Threat {
            unauthorized_access: rng.gen_range(0..=5),
            jamming_signal: rng.gen_range(0..=3),
            tampering_attempts: rng.gen_range(0..=4),
            spoofing_attempts: rng.gen_range(0..=3),
            anomaly_score: round2(rng.gen_range(0.0..1.0)),
        },
    };

    let battery = match class {
        SensorClass::Atmospheric => rng.gen_range(30.0..100.0),
        _ => rng.gen_range(20.0..100.0),
    };

    let statuses = class.statuses();
    let (prefix, base) = class.id_prefix();

    SensorReading {
        sensor_id: format!("{}-{}", prefix, base + index as u32),
        metrics,
        battery_level: round2(battery),
        status: statuses[rng.gen_range(0..statuses.len())].to_string(),
        updated_at: Utc::now(),
    }
}

pub fn batch(class: SensorClass, count: usize) -> Vec<SensorReading> {
    (0..count).map(|i| generate(class, i)).collect()
}

/// Background refresh loop. Regenerates every class batch on each tick.
pub async fn run_refresh(store: Arc<GatewayStore>, refresh_secs: u64, per_class: usize) {
    let mut interval = tokio::time::interval(Duration::from_secs(refresh_secs.max(1)));
    loop {
        interval.tick().await;
        for class in SensorClass::ALL {
            store.replace_batch(class, batch(class, per_class));
        }
        tracing::debug!("telemetry refreshed: {} readings per class", per_class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_stable_across_regeneration() {
        let a = generate(SensorClass::Soil, 2);
        let b = generate(SensorClass::Soil, 2);
        assert_eq!(a.sensor_id, "soil-1002");
        assert_eq!(a.sensor_id, b.sensor_id);
    }

    #[test]
    fn readings_respect_class_ranges() {
        for _ in 0..50 {
            match generate(SensorClass::Soil, 0).metrics {
                SensorMetrics::Soil { temperature, moisture, ph, nutrient_level } => {
                    assert!((15.0..30.0).contains(&temperature));
                    assert!((20.0..70.0).contains(&moisture));
                    assert!((5.0..7.5).contains(&ph));
                    assert!((1.0..5.0).contains(&nutrient_level));
                }
                _ => panic!("wrong class generated"),
            }
        }
    }

    #[test]
    fn status_comes_from_the_class_vocabulary() {
        for class in SensorClass::ALL {
            for _ in 0..20 {
                let reading = generate(class, 0);
                assert!(class.statuses().contains(&reading.status.as_str()));
            }
        }
    }

    #[test]
    fn batch_produces_distinct_ids() {
        let readings = batch(SensorClass::Water, 5);
        assert_eq!(readings.len(), 5);
        assert_eq!(readings[0].sensor_id, "water-3000");
        assert_eq!(readings[4].sensor_id, "water-3004");
    }
}
