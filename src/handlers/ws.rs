//! Push channels
//!
//! Two websocket surfaces: `/ws/alerts` forwards every logged detection
//! outcome to subscribers, and `/ws/sensors/:class` emits a fresh reading on
//! a fixed cadence. Auth uses a `?token=` query parameter because browsers
//! cannot set headers on websocket upgrades; a bad token gets a policy
//! violation close frame, mirroring the HTTP 401 taxonomy.

use std::borrow::Cow;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use rand::Rng;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::handlers::auth::decode_token;
use crate::models::SensorClass;
use crate::{sim, AppState};

const POLICY_VIOLATION: u16 = 1008;
const UNSUPPORTED_DATA: u16 = 1003;

/// Seconds between frames on the per-class telemetry streams.
const STREAM_PERIOD_SECS: u64 = 2;

#[derive(Debug, Deserialize)]
pub struct WsAuth {
    pub token: Option<String>,
}

pub async fn alerts(
    State(state): State<AppState>,
    Query(auth): Query<WsAuth>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| alerts_stream(state, auth, socket))
}

async fn alerts_stream(state: AppState, auth: WsAuth, mut socket: WebSocket) {
    let Some(username) = authenticate(&state, auth.token.as_deref(), &mut socket).await else {
        return;
    };

    state.store.stream_opened("alerts");
    tracing::info!("alert stream connected: {}", username);

    let mut rx = state.alerts.subscribe();
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(entry) => {
                    let Ok(frame) = serde_json::to_string(&entry) else { continue };
                    if socket.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("alert stream for {} lagged, {} entries skipped", username, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                // Clients may send keep-alive chatter; only hangups matter.
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }

    state.store.stream_closed("alerts");
    tracing::info!("alert stream disconnected: {}", username);
}

pub async fn sensor_stream(
    State(state): State<AppState>,
    Path(class): Path<String>,
    Query(auth): Query<WsAuth>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_sensor_stream(state, class, auth, socket))
}

async fn run_sensor_stream(state: AppState, class: String, auth: WsAuth, mut socket: WebSocket) {
    let Some(class) = SensorClass::parse(&class) else {
        close(&mut socket, UNSUPPORTED_DATA, "unknown sensor class").await;
        return;
    };

    let Some(username) = authenticate(&state, auth.token.as_deref(), &mut socket).await else {
        return;
    };

    let label = class.as_str();
    state.store.stream_opened(label);
    tracing::info!("{} stream connected: {}", label, username);

    let per_class = state.config.sensors_per_class.max(1);
    let mut interval = tokio::time::interval(Duration::from_secs(STREAM_PERIOD_SECS));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let index = rand::thread_rng().gen_range(0..per_class);
                let reading = sim::generate(class, index);
                let Ok(frame) = serde_json::to_string(&reading) else { continue };
                if socket.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }

    state.store.stream_closed(label);
    tracing::info!("{} stream disconnected: {}", label, username);
}

/// Verify the query-param token. On failure, send a policy-violation close
/// and return None.
async fn authenticate(state: &AppState, token: Option<&str>, socket: &mut WebSocket) -> Option<String> {
    match token.and_then(|t| decode_token(t, &state.config.jwt_secret).ok()) {
        Some(claims) => Some(claims.sub),
        None => {
            close(socket, POLICY_VIOLATION, "authentication required").await;
            None
        }
    }
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: Cow::from(reason),
        })))
        .await;
}
