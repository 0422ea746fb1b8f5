//! Attack log and audit handlers

use std::collections::BTreeMap;

use axum::{extract::{Path, Query, State}, Json};

use crate::{AppState, AppError, AppResult};
use crate::handlers::detect::record_and_broadcast;
use crate::middleware::auth::{require_admin, UserContext};
use crate::models::{AttackLogEntry, AttackType, LogFilter, Severity};

/// How many blocked entries the alerts endpoint returns.
const ALERT_LIMIT: usize = 10;

/// Filterable slice of the attack log, newest first
pub async fn list(
    State(state): State<AppState>,
    _user: UserContext,
    Query(filter): Query<LogFilter>,
) -> Json<Vec<AttackLogEntry>> {
    Json(state.store.logs(&filter))
}

/// Most recent blocked entries
pub async fn alerts(
    State(state): State<AppState>,
    _user: UserContext,
) -> Json<Vec<AttackLogEntry>> {
    Json(state.store.alerts(ALERT_LIMIT))
}

/// Synthetic alert for dashboard demos. Admin only.
pub async fn trigger(
    State(state): State<AppState>,
    user: UserContext,
    Path(attack_type): Path<String>,
) -> AppResult<Json<AttackLogEntry>> {
    require_admin(&user)?;

    let attack_type = AttackType::parse(&attack_type)
        .ok_or_else(|| AppError::ValidationError(format!("Invalid attack type '{}'", attack_type)))?;

    let (message, severity) = match attack_type {
        AttackType::Spoofing => ("Spoofing detected - signature mismatch", Severity::Medium),
        AttackType::Replay => ("Replay detected - duplicate nonce", Severity::Medium),
        AttackType::FirmwareInjection => {
            ("Firmware rejected - hash differs from pinned image", Severity::High)
        }
        AttackType::Drift => ("Drift detected - anomalous reading series", Severity::High),
        AttackType::Overflow => ("Overflow blocked - payload length exceeded", Severity::High),
        AttackType::Ddos => ("Flood detected - excessive requests", Severity::High),
        AttackType::ApiAbuse => ("API abuse - rate limit triggered", Severity::Medium),
        AttackType::SideChannel => ("Side-channel suspected - timing anomaly", Severity::High),
        AttackType::TamperBreach => ("Tamper alert - config hash mismatch", Severity::High),
        AttackType::SensorHijack => ("Sensor hijack - unknown sensor ID", Severity::High),
    };

    let entry = AttackLogEntry::new("sim-sensor-01", attack_type, message, severity, true);
    tracing::info!("synthetic {} alert triggered by {}", attack_type.as_str(), user.username);

    Ok(Json(record_and_broadcast(&state, entry)))
}

/// Live websocket counts per stream
pub async fn connections(
    State(state): State<AppState>,
    _user: UserContext,
) -> Json<BTreeMap<String, usize>> {
    Json(state.store.stream_counts())
}
