//! Configuration module

use std::env;

use sha2::{Digest, Sha256};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// JWT secret key
    pub jwt_secret: String,

    /// JWT expiration in hours
    pub jwt_expiration_hours: u64,

    /// Seed passwords for the built-in accounts
    pub admin_password: String,
    pub operator_password: String,
    pub viewer_password: String,

    /// Flood detection window (seconds) and per-window request threshold
    pub ddos_window_secs: i64,
    pub ddos_threshold: u32,

    /// API-abuse window (seconds) and per-window request threshold
    pub abuse_window_secs: i64,
    pub abuse_threshold: u32,

    /// Cooldown applied to a key after it trips either threshold (seconds)
    pub cooldown_secs: i64,

    /// Maximum age of a replay-protected timestamp (seconds)
    pub nonce_freshness_secs: i64,

    /// Standard deviations before a reading counts as drift
    pub drift_z_threshold: f64,

    /// Accepted crypto-op timing band (microseconds)
    pub timing_min_us: u64,
    pub timing_max_us: u64,

    /// Largest sensor payload accepted before the overflow rule trips (bytes)
    pub max_payload_bytes: usize,

    /// Attack log ring capacity
    pub log_capacity: usize,

    /// Telemetry refresh interval (seconds) and batch size per sensor class
    pub refresh_secs: u64,
    pub sensors_per_class: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 8080),

            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "farmgate-super-secret-key-change-in-production".to_string()),

            jwt_expiration_hours: env_parse("JWT_EXPIRATION_HOURS", 24),

            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "dev-admin-change-me".to_string()),
            operator_password: env::var("OPERATOR_PASSWORD")
                .unwrap_or_else(|_| "dev-operator-change-me".to_string()),
            viewer_password: env::var("VIEWER_PASSWORD")
                .unwrap_or_else(|_| "dev-viewer-change-me".to_string()),

            ddos_window_secs: env_parse("DDOS_WINDOW_SECS", 10),
            ddos_threshold: env_parse("DDOS_THRESHOLD", 10),

            abuse_window_secs: env_parse("ABUSE_WINDOW_SECS", 30),
            abuse_threshold: env_parse("ABUSE_THRESHOLD", 5),

            cooldown_secs: env_parse("COOLDOWN_SECS", 60),

            nonce_freshness_secs: env_parse("NONCE_FRESHNESS_SECS", 30),

            drift_z_threshold: env_parse("DRIFT_Z_THRESHOLD", 3.0),

            timing_min_us: env_parse("TIMING_MIN_US", 80),
            timing_max_us: env_parse("TIMING_MAX_US", 120),

            max_payload_bytes: env_parse("MAX_PAYLOAD_BYTES", 1024),

            log_capacity: env_parse("LOG_CAPACITY", 1000),

            refresh_secs: env_parse("REFRESH_SECS", 5),
            sensors_per_class: env_parse("SENSORS_PER_CLASS", 5),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Hash of the tunable detection settings, pinned at boot.
    ///
    /// The tamper-breach rule compares client-supplied config hashes against
    /// this value. Secrets are deliberately excluded from the digest.
    pub fn fingerprint(&self) -> String {
        let canonical = format!(
            "ddos={}/{} abuse={}/{} cooldown={} freshness={} drift={} timing={}..{} payload={}",
            self.ddos_window_secs,
            self.ddos_threshold,
            self.abuse_window_secs,
            self.abuse_threshold,
            self.cooldown_secs,
            self.nonce_freshness_secs,
            self.drift_z_threshold,
            self.timing_min_us,
            self.timing_max_us,
            self.max_payload_bytes,
        );
        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_for_same_settings() {
        let a = Config::from_env();
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_tracks_detection_settings() {
        let a = Config::from_env();
        let mut b = a.clone();
        b.ddos_threshold += 1;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
