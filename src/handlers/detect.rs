//! Attack-detection handlers
//!
//! Every endpoint follows the same chain: validate the request, evaluate one
//! rule, append the outcome to the attack log, broadcast it to alert
//! subscribers, and return the entry.

use axum::{extract::{Path, State}, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{AppState, AppResult};
use crate::detect::drift::DriftDecision;
use crate::detect::firmware::FirmwareDecision;
use crate::detect::nonce::NonceDecision;
use crate::detect::rate_window::WindowDecision;
use crate::detect::timing::{sample_crypto_timing, TimingBand};
use crate::detect::{drift, signature, DetectError};
use crate::middleware::auth::{require_admin, UserContext};
use crate::models::{AttackLogEntry, AttackType, Severity};

/// Append to the log ring and push to alert-stream subscribers.
pub fn record_and_broadcast(state: &AppState, entry: AttackLogEntry) -> AttackLogEntry {
    let entry = state.store.record(entry);
    // A send error only means nobody is subscribed right now.
    let _ = state.alerts.send(entry.clone());
    entry
}

fn ensure_known(state: &AppState, sensor_id: &str) -> Result<(), DetectError> {
    if state.store.is_known_sensor(sensor_id) {
        Ok(())
    } else {
        Err(DetectError::UnknownSensor(sensor_id.to_string()))
    }
}

/// Oversized payloads are blocked before the endpoint's own rule runs.
fn check_overflow(state: &AppState, sensor_id: &str, payload: &str) -> Option<AttackLogEntry> {
    let max = state.config.max_payload_bytes;
    if payload.len() > max {
        Some(AttackLogEntry::new(
            sensor_id,
            AttackType::Overflow,
            format!("Overflow blocked - payload {} bytes exceeds limit of {}", payload.len(), max),
            Severity::High,
            true,
        ))
    } else {
        None
    }
}

// ----------------------------------------------------------------------
// DDoS / flood
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct DdosRequest {
    #[validate(length(min = 1))]
    pub sensor_id: String,
    /// Per-request threshold override; the configured default applies
    /// when absent.
    pub threshold: Option<u32>,
}

pub async fn ddos(
    State(state): State<AppState>,
    _user: UserContext,
    Json(req): Json<DdosRequest>,
) -> AppResult<Json<AttackLogEntry>> {
    req.validate()?;
    ensure_known(&state, &req.sensor_id)?;

    let decision = state.store.observe_flood(&req.sensor_id, req.threshold, Utc::now());
    let entry = window_entry(&req.sensor_id, AttackType::Ddos, "flood", decision);

    Ok(Json(record_and_broadcast(&state, entry)))
}

fn window_entry(
    sensor_id: &str,
    attack_type: AttackType,
    noun: &str,
    decision: WindowDecision,
) -> AttackLogEntry {
    match decision {
        WindowDecision::Allowed { count, threshold } => AttackLogEntry::new(
            sensor_id,
            attack_type,
            format!("No {} detected - {}/{} requests in window", noun, count, threshold),
            Severity::None,
            false,
        ),
        WindowDecision::ThresholdExceeded { count, threshold, retry_at } => AttackLogEntry::new(
            sensor_id,
            attack_type,
            format!(
                "Blocked - {} requests reached threshold {}, cooldown until {}",
                count,
                threshold,
                retry_at.to_rfc3339()
            ),
            Severity::High,
            true,
        ),
        WindowDecision::CooldownActive { until } => AttackLogEntry::new(
            sensor_id,
            attack_type,
            format!("Blocked - cooldown active until {}", until.to_rfc3339()),
            Severity::High,
            true,
        ),
    }
}

// ----------------------------------------------------------------------
// Replay
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct ReplayRequest {
    #[validate(length(min = 1))]
    pub sensor_id: String,
    pub payload: String,
    pub timestamp: chrono::DateTime<Utc>,
    #[validate(length(min = 1))]
    pub nonce: String,
}

pub async fn replay(
    State(state): State<AppState>,
    _user: UserContext,
    Json(req): Json<ReplayRequest>,
) -> AppResult<Json<AttackLogEntry>> {
    req.validate()?;
    ensure_known(&state, &req.sensor_id)?;

    if let Some(entry) = check_overflow(&state, &req.sensor_id, &req.payload) {
        return Ok(Json(record_and_broadcast(&state, entry)));
    }

    let decision = state
        .store
        .validate_nonce(&req.nonce, req.timestamp, Utc::now())?;

    let entry = match decision {
        NonceDecision::Accepted => AttackLogEntry::new(
            &req.sensor_id,
            AttackType::Replay,
            "Payload accepted - fresh nonce",
            Severity::None,
            false,
        ),
        NonceDecision::Replayed => AttackLogEntry::new(
            &req.sensor_id,
            AttackType::Replay,
            "Replay detected - duplicate nonce",
            Severity::High,
            true,
        ),
    };

    Ok(Json(record_and_broadcast(&state, entry)))
}

// ----------------------------------------------------------------------
// Spoofing
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SpoofingRequest {
    #[validate(length(min = 1))]
    pub sensor_id: String,
    pub payload: String,
    #[validate(length(min = 1))]
    pub signature: String,
}

pub async fn spoofing(
    State(state): State<AppState>,
    _user: UserContext,
    Json(req): Json<SpoofingRequest>,
) -> AppResult<Json<AttackLogEntry>> {
    req.validate()?;
    ensure_known(&state, &req.sensor_id)?;

    if let Some(entry) = check_overflow(&state, &req.sensor_id, &req.payload) {
        return Ok(Json(record_and_broadcast(&state, entry)));
    }

    let entry = if signature::verify(&req.sensor_id, &req.payload, &req.signature) {
        AttackLogEntry::new(
            &req.sensor_id,
            AttackType::Spoofing,
            "Signature verified",
            Severity::None,
            false,
        )
    } else {
        AttackLogEntry::new(
            &req.sensor_id,
            AttackType::Spoofing,
            "Spoofing detected - signature mismatch",
            Severity::High,
            true,
        )
    };

    Ok(Json(record_and_broadcast(&state, entry)))
}

// ----------------------------------------------------------------------
// Firmware
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct FirmwareRequest {
    #[validate(length(min = 1))]
    pub sensor_id: String,
    #[validate(length(min = 1))]
    pub firmware_hash: String,
}

pub async fn firmware(
    State(state): State<AppState>,
    _user: UserContext,
    Json(req): Json<FirmwareRequest>,
) -> AppResult<Json<AttackLogEntry>> {
    req.validate()?;
    ensure_known(&state, &req.sensor_id)?;

    let entry = match state.store.verify_firmware(&req.sensor_id, &req.firmware_hash) {
        FirmwareDecision::Pinned => AttackLogEntry::new(
            &req.sensor_id,
            AttackType::FirmwareInjection,
            "Firmware accepted - hash pinned for this sensor",
            Severity::None,
            false,
        ),
        FirmwareDecision::Verified => AttackLogEntry::new(
            &req.sensor_id,
            AttackType::FirmwareInjection,
            "Firmware accepted - hash matches pinned image",
            Severity::None,
            false,
        ),
        FirmwareDecision::Mismatch => AttackLogEntry::new(
            &req.sensor_id,
            AttackType::FirmwareInjection,
            "Firmware rejected - hash differs from pinned image",
            Severity::High,
            true,
        ),
    };

    Ok(Json(record_and_broadcast(&state, entry)))
}

// ----------------------------------------------------------------------
// Drift / ML evasion
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct DriftRequest {
    #[validate(length(min = 1))]
    pub sensor_id: String,
    pub values: Vec<f64>,
}

pub async fn drift(
    State(state): State<AppState>,
    _user: UserContext,
    Json(req): Json<DriftRequest>,
) -> AppResult<Json<AttackLogEntry>> {
    req.validate()?;
    ensure_known(&state, &req.sensor_id)?;

    let entry = match drift::scan(&req.values, state.config.drift_z_threshold) {
        DriftDecision::Insufficient { have, need } => {
            return Err(crate::AppError::ValidationError(format!(
                "need at least {} samples, got {}",
                need, have
            )));
        }
        DriftDecision::Stable { mean } => AttackLogEntry::new(
            &req.sensor_id,
            AttackType::Drift,
            format!("Sensor stable - no drift (mean {:.2})", mean),
            Severity::None,
            false,
        ),
        DriftDecision::Outlier { index, value, score } => AttackLogEntry::new(
            &req.sensor_id,
            AttackType::Drift,
            format!(
                "Drift detected - value {:.2} at index {} scored {:.1}",
                value, index, score
            ),
            Severity::High,
            true,
        ),
    };

    Ok(Json(record_and_broadcast(&state, entry)))
}

// ----------------------------------------------------------------------
// Sensor hijack
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct HijackRequest {
    #[validate(length(min = 1))]
    pub sensor_id: String,
}

pub async fn hijack(
    State(state): State<AppState>,
    _user: UserContext,
    Json(req): Json<HijackRequest>,
) -> AppResult<Json<AttackLogEntry>> {
    req.validate()?;

    let entry = if state.store.is_known_sensor(&req.sensor_id) {
        AttackLogEntry::new(
            &req.sensor_id,
            AttackType::SensorHijack,
            "Sensor ID verified via whitelist",
            Severity::None,
            false,
        )
    } else {
        AttackLogEntry::new(
            &req.sensor_id,
            AttackType::SensorHijack,
            "Sensor hijack - unknown sensor ID",
            Severity::High,
            true,
        )
    };

    Ok(Json(record_and_broadcast(&state, entry)))
}

// ----------------------------------------------------------------------
// API abuse
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct AbuseRequest {
    #[validate(length(min = 1))]
    pub sensor_id: String,
}

pub async fn api_abuse(
    State(state): State<AppState>,
    _user: UserContext,
    Json(req): Json<AbuseRequest>,
) -> AppResult<Json<AttackLogEntry>> {
    req.validate()?;
    ensure_known(&state, &req.sensor_id)?;

    let decision = state.store.observe_abuse(&req.sensor_id, Utc::now());
    let entry = window_entry(&req.sensor_id, AttackType::ApiAbuse, "abuse", decision);

    Ok(Json(record_and_broadcast(&state, entry)))
}

// ----------------------------------------------------------------------
// Tamper breach
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct TamperRequest {
    #[validate(length(min = 1))]
    pub sensor_id: String,
    #[validate(length(min = 1))]
    pub config_hash: String,
}

pub async fn tamper(
    State(state): State<AppState>,
    _user: UserContext,
    Json(req): Json<TamperRequest>,
) -> AppResult<Json<AttackLogEntry>> {
    req.validate()?;
    ensure_known(&state, &req.sensor_id)?;

    let entry = if req.config_hash == state.store.config_hash() {
        AttackLogEntry::new(
            &req.sensor_id,
            AttackType::TamperBreach,
            "Config verified",
            Severity::None,
            false,
        )
    } else {
        AttackLogEntry::new(
            &req.sensor_id,
            AttackType::TamperBreach,
            "Tamper alert - config hash differs from boot pin",
            Severity::High,
            true,
        )
    };

    Ok(Json(record_and_broadcast(&state, entry)))
}

// ----------------------------------------------------------------------
// Side channel
// ----------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SideChannelRequest {
    #[validate(length(min = 1))]
    pub sensor_id: String,
    /// Measured crypto-op duration; a simulated sample is used when absent.
    pub timing_us: Option<u64>,
}

pub async fn side_channel(
    State(state): State<AppState>,
    _user: UserContext,
    Json(req): Json<SideChannelRequest>,
) -> AppResult<Json<AttackLogEntry>> {
    req.validate()?;
    ensure_known(&state, &req.sensor_id)?;

    let band = TimingBand {
        min_us: state.config.timing_min_us,
        max_us: state.config.timing_max_us,
    };
    let duration_us = req.timing_us.unwrap_or_else(sample_crypto_timing);

    let entry = if band.contains(duration_us) {
        AttackLogEntry::new(
            &req.sensor_id,
            AttackType::SideChannel,
            format!("Timing normal - {}us", duration_us),
            Severity::None,
            false,
        )
    } else {
        AttackLogEntry::new(
            &req.sensor_id,
            AttackType::SideChannel,
            format!("Side-channel suspected - timing anomaly ({}us)", duration_us),
            Severity::High,
            true,
        )
    };

    Ok(Json(record_and_broadcast(&state, entry)))
}

// ----------------------------------------------------------------------
// Admin reset
// ----------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
    pub sensor_id: String,
}

/// Clear windows, cooldowns and the firmware pin for one sensor
pub async fn reset(
    State(state): State<AppState>,
    user: UserContext,
    Path(sensor_id): Path<String>,
) -> AppResult<Json<ResetResponse>> {
    require_admin(&user)?;

    state.store.reset_sensor(&sensor_id);
    tracing::info!("detection state reset for {} by {}", sensor_id, user.username);

    Ok(Json(ResetResponse {
        status: "reset",
        sensor_id,
    }))
}
