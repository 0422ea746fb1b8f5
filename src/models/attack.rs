//! Attack log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attack categories the gateway simulates detection for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    Ddos,
    Replay,
    Spoofing,
    FirmwareInjection,
    Drift,
    SensorHijack,
    ApiAbuse,
    TamperBreach,
    SideChannel,
    Overflow,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ddos => "ddos",
            Self::Replay => "replay",
            Self::Spoofing => "spoofing",
            Self::FirmwareInjection => "firmware_injection",
            Self::Drift => "drift",
            Self::SensorHijack => "sensor_hijack",
            Self::ApiAbuse => "api_abuse",
            Self::TamperBreach => "tamper_breach",
            Self::SideChannel => "side_channel",
            Self::Overflow => "overflow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ddos" => Some(Self::Ddos),
            "replay" => Some(Self::Replay),
            "spoofing" => Some(Self::Spoofing),
            "firmware_injection" => Some(Self::FirmwareInjection),
            "drift" => Some(Self::Drift),
            "sensor_hijack" => Some(Self::SensorHijack),
            "api_abuse" => Some(Self::ApiAbuse),
            "tamper_breach" => Some(Self::TamperBreach),
            "side_channel" => Some(Self::SideChannel),
            "overflow" => Some(Self::Overflow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

}

/// One entry in the append-only detection log. Detection endpoints return
/// the entry they appended, blocked or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub sensor_id: String,
    pub attack_type: AttackType,
    pub message: String,
    pub severity: Severity,
    pub blocked: bool,
}

impl AttackLogEntry {
    pub fn new(
        sensor_id: impl Into<String>,
        attack_type: AttackType,
        message: impl Into<String>,
        severity: Severity,
        blocked: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            sensor_id: sensor_id.into(),
            attack_type,
            message: message.into(),
            severity,
            blocked,
        }
    }
}

/// Query filter for the log read endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct LogFilter {
    pub attack_type: Option<String>,
    pub severity: Option<String>,
    pub blocked: Option<bool>,
    pub sensor_id: Option<String>,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_type_round_trips_through_wire_name() {
        for t in [
            AttackType::Ddos,
            AttackType::FirmwareInjection,
            AttackType::SideChannel,
            AttackType::Overflow,
        ] {
            assert_eq!(AttackType::parse(t.as_str()), Some(t));
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn severity_orders_none_lowest() {
        assert!(Severity::None < Severity::Low);
        assert!(Severity::Medium < Severity::High);
    }
}
