//! Sensor telemetry handlers

use std::collections::BTreeMap;

use axum::{extract::{Path, State}, Json};
use serde::Serialize;

use crate::{AppState, AppError, AppResult};
use crate::middleware::auth::UserContext;
use crate::models::{SensorClass, SensorReading};

#[derive(Debug, Serialize)]
pub struct SensorTypesResponse {
    pub sensor_types: Vec<&'static str>,
    pub aliases: BTreeMap<&'static str, &'static str>,
    pub sensor_ids: Vec<String>,
}

/// List sensor classes, dashboard aliases, and the live id set
pub async fn types(
    State(state): State<AppState>,
    _user: UserContext,
) -> Json<SensorTypesResponse> {
    let aliases = BTreeMap::from([("atmosphere", "atmospheric")]);

    Json(SensorTypesResponse {
        sensor_types: SensorClass::ALL.iter().map(|c| c.as_str()).collect(),
        aliases,
        sensor_ids: state.store.sensor_ids(),
    })
}

/// Per-class field means over the latest batch
pub async fn averages(
    State(state): State<AppState>,
    _user: UserContext,
) -> Json<BTreeMap<String, BTreeMap<String, f64>>> {
    Json(state.store.averages())
}

/// Latest batch for one class
pub async fn latest(
    State(state): State<AppState>,
    _user: UserContext,
    Path(class): Path<String>,
) -> AppResult<Json<Vec<SensorReading>>> {
    let class = SensorClass::parse(&class)
        .ok_or_else(|| AppError::NotFound(format!("Sensor class '{}' not found", class)))?;

    Ok(Json(state.store.latest(class).unwrap_or_default()))
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub sensor_id: String,
}

/// Ingest one reading. Last write per sensor id wins.
pub async fn ingest(
    State(state): State<AppState>,
    _user: UserContext,
    Json(reading): Json<SensorReading>,
) -> AppResult<Json<IngestResponse>> {
    if reading.sensor_id.is_empty() {
        return Err(AppError::ValidationError("sensor_id must not be empty".to_string()));
    }

    let sensor_id = reading.sensor_id.clone();
    state.store.ingest(reading);

    Ok(Json(IngestResponse {
        status: "success",
        sensor_id,
    }))
}
