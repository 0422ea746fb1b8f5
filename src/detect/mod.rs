//! Detection rules
//!
//! Each module holds one rule plus the small mutable state it needs. State
//! lives inside [`crate::store::GatewayStore`]; handlers never touch these
//! maps directly.

pub mod drift;
pub mod firmware;
pub mod nonce;
pub mod rate_window;
pub mod signature;
pub mod timing;

use thiserror::Error;

/// Request-level failures surfaced by the detection layer. These map to
/// HTTP 400 at the handler boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectError {
    #[error("stale timestamp: {age_secs}s exceeds the {budget_secs}s freshness budget")]
    StaleTimestamp { age_secs: i64, budget_secs: i64 },

    #[error("invalid sensor ID '{0}'")]
    UnknownSensor(String),
}
