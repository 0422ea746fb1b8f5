//! Sensor model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five telemetry classes served by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorClass {
    Soil,
    Water,
    Atmospheric,
    Plant,
    Threat,
}

impl SensorClass {
    pub const ALL: [SensorClass; 5] = [
        Self::Soil,
        Self::Water,
        Self::Atmospheric,
        Self::Plant,
        Self::Threat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soil => "soil",
            Self::Water => "water",
            Self::Atmospheric => "atmospheric",
            Self::Plant => "plant",
            Self::Threat => "threat",
        }
    }

    /// Parse a class name. Accepts the dashboard's legacy "atmosphere" alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "soil" => Some(Self::Soil),
            "water" => Some(Self::Water),
            "atmospheric" | "atmosphere" => Some(Self::Atmospheric),
            "plant" => Some(Self::Plant),
            "threat" => Some(Self::Threat),
            _ => None,
        }
    }

    /// Sensor-id prefix and numbering base for generated ids.
    pub fn id_prefix(&self) -> (&'static str, u32) {
        match self {
            Self::Soil => ("soil", 1000),
            Self::Atmospheric => ("atm", 2000),
            Self::Water => ("water", 3000),
            Self::Plant => ("plant", 4000),
            Self::Threat => ("threat", 5000),
        }
    }

    /// Status vocabulary reported by devices of this class.
    pub fn statuses(&self) -> &'static [&'static str] {
        match self {
            Self::Soil | Self::Water | Self::Atmospheric => {
                &["active", "sleeping", "compromised"]
            }
            Self::Threat => &["active", "compromised", "alerting"],
            Self::Plant => &["healthy", "wilting", "diseased"],
        }
    }
}

/// Class-specific measurements, flattened into the reading JSON with a
/// `class` discriminator field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum SensorMetrics {
    Soil {
        temperature: f64,
        moisture: f64,
        ph: f64,
        nutrient_level: f64,
    },
    Water {
        flow_rate: f64,
        water_level: f64,
        salinity: f64,
        ph: f64,
        turbidity: f64,
    },
    Atmospheric {
        air_temperature: f64,
        humidity: f64,
        co2: f64,
        wind_speed: f64,
        rainfall: f64,
    },
    Plant {
        leaf_moisture: f64,
        chlorophyll_level: f64,
        growth_rate: f64,
        disease_risk: f64,
        stem_diameter: f64,
    },
    Threat {
        unauthorized_access: u32,
        jamming_signal: u32,
        tampering_attempts: u32,
        spoofing_attempts: u32,
        anomaly_score: f64,
    },
}

impl SensorMetrics {
    pub fn class(&self) -> SensorClass {
        match self {
            Self::Soil { .. } => SensorClass::Soil,
            Self::Water { .. } => SensorClass::Water,
            Self::Atmospheric { .. } => SensorClass::Atmospheric,
            Self::Plant { .. } => SensorClass::Plant,
            Self::Threat { .. } => SensorClass::Threat,
        }
    }

    /// Numeric fields as (name, value) pairs, for the averages report.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        match *self {
            Self::Soil {
                temperature,
                moisture,
                ph,
                nutrient_level,
            } => vec![
                ("temperature", temperature),
                ("moisture", moisture),
                ("ph", ph),
                ("nutrient_level", nutrient_level),
            ],
            Self::Water {
                flow_rate,
                water_level,
                salinity,
                ph,
                turbidity,
            } => vec![
                ("flow_rate", flow_rate),
                ("water_level", water_level),
                ("salinity", salinity),
                ("ph", ph),
                ("turbidity", turbidity),
            ],
            Self::Atmospheric {
                air_temperature,
                humidity,
                co2,
                wind_speed,
                rainfall,
            } => vec![
                ("air_temperature", air_temperature),
                ("humidity", humidity),
                ("co2", co2),
                ("wind_speed", wind_speed),
                ("rainfall", rainfall),
            ],
            Self::Plant {
                leaf_moisture,
                chlorophyll_level,
                growth_rate,
                disease_risk,
                stem_diameter,
            } => vec![
                ("leaf_moisture", leaf_moisture),
                ("chlorophyll_level", chlorophyll_level),
                ("growth_rate", growth_rate),
                ("disease_risk", disease_risk),
                ("stem_diameter", stem_diameter),
            ],
            Self::Threat {
                unauthorized_access,
                jamming_signal,
                tampering_attempts,
                spoofing_attempts,
                anomaly_score,
            } => vec![
                ("unauthorized_access", unauthorized_access as f64),
                ("jamming_signal", jamming_signal as f64),
                ("tampering_attempts", tampering_attempts as f64),
                ("spoofing_attempts", spoofing_attempts as f64),
                ("anomaly_score", anomaly_score),
            ],
        }
    }
}

/// One telemetry reading. Last write per `sensor_id` wins; there is no
/// versioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: String,
    #[serde(flatten)]
    pub metrics: SensorMetrics,
    pub battery_level: f64,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl SensorReading {
    pub fn class(&self) -> SensorClass {
        self.metrics.class()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_parse_accepts_alias() {
        assert_eq!(SensorClass::parse("atmosphere"), Some(SensorClass::Atmospheric));
        assert_eq!(SensorClass::parse("atmospheric"), Some(SensorClass::Atmospheric));
        assert_eq!(SensorClass::parse("greenhouse"), None);
    }

    #[test]
    fn reading_serializes_flat_with_class_tag() {
        let reading = SensorReading {
            sensor_id: "soil-1000".to_string(),
            metrics: SensorMetrics::Soil {
                temperature: 21.5,
                moisture: 44.0,
                ph: 6.8,
                nutrient_level: 3.2,
            },
            battery_level: 87.0,
            status: "active".to_string(),
            updated_at: Utc::now(),
        };

        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(value["class"], "soil");
        assert_eq!(value["temperature"], 21.5);
        assert_eq!(value["sensor_id"], "soil-1000");

        let back: SensorReading = serde_json::from_value(value).unwrap();
        assert_eq!(back.class(), SensorClass::Soil);
    }
}
