//! Gateway state
//!
//! One struct owns every mutable map the handlers share: latest telemetry,
//! the attack log ring, nonce and firmware registries, and the rate windows.
//! Each concern sits behind its own `parking_lot` lock; lock scope never
//! leaves a method, and no guard is held across an await point.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::Config;
use crate::detect::firmware::{FirmwareDecision, FirmwarePins};
use crate::detect::nonce::{NonceDecision, NonceRegistry};
use crate::detect::rate_window::{RateWindow, WindowConfig, WindowDecision};
use crate::detect::DetectError;
use crate::models::{AttackLogEntry, LogFilter, SensorClass, SensorReading, User};

pub struct GatewayStore {
    sensors: RwLock<HashMap<SensorClass, Vec<SensorReading>>>,
    log: RwLock<VecDeque<AttackLogEntry>>,
    log_capacity: usize,
    nonces: RwLock<NonceRegistry>,
    flood: RwLock<RateWindow>,
    abuse: RwLock<RateWindow>,
    firmware: RwLock<FirmwarePins>,
    streams: RwLock<BTreeMap<String, usize>>,
    users: Vec<User>,
    config_hash: String,
}

impl GatewayStore {
    pub fn new(config: &Config, users: Vec<User>) -> Self {
        let flood = WindowConfig {
            window: chrono::Duration::seconds(config.ddos_window_secs),
            cooldown: chrono::Duration::seconds(config.cooldown_secs),
            threshold: config.ddos_threshold,
        };
        let abuse = WindowConfig {
            window: chrono::Duration::seconds(config.abuse_window_secs),
            cooldown: chrono::Duration::seconds(config.cooldown_secs),
            threshold: config.abuse_threshold,
        };

        Self {
            sensors: RwLock::new(HashMap::new()),
            log: RwLock::new(VecDeque::new()),
            log_capacity: config.log_capacity,
            nonces: RwLock::new(NonceRegistry::new(config.nonce_freshness_secs)),
            flood: RwLock::new(RateWindow::new(flood)),
            abuse: RwLock::new(RateWindow::new(abuse)),
            firmware: RwLock::new(FirmwarePins::new()),
            streams: RwLock::new(BTreeMap::new()),
            users,
            config_hash: config.fingerprint(),
        }
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    pub fn find_user(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    // ------------------------------------------------------------------
    // Attack log
    // ------------------------------------------------------------------

    /// Append an entry, newest first. The ring drops the oldest entry once
    /// capacity is reached.
    pub fn record(&self, entry: AttackLogEntry) -> AttackLogEntry {
        let mut log = self.log.write();
        log.push_front(entry.clone());
        log.truncate(self.log_capacity);
        entry
    }

    pub fn logs(&self, filter: &LogFilter) -> Vec<AttackLogEntry> {
        let limit = filter.limit.unwrap_or(100);
        let log = self.log.read();
        log.iter()
            .filter(|e| {
                filter
                    .attack_type
                    .as_deref()
                    .map_or(true, |t| e.attack_type.as_str() == t)
            })
            .filter(|e| {
                filter
                    .severity
                    .as_deref()
                    .map_or(true, |s| e.severity.as_str() == s)
            })
            .filter(|e| filter.blocked.map_or(true, |b| e.blocked == b))
            .filter(|e| {
                filter
                    .sensor_id
                    .as_deref()
                    .map_or(true, |id| e.sensor_id == id)
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Most recent blocked entries, newest first.
    pub fn alerts(&self, limit: usize) -> Vec<AttackLogEntry> {
        let log = self.log.read();
        log.iter().filter(|e| e.blocked).take(limit).cloned().collect()
    }

    // ------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------

    /// Replace the latest batch for a class. Called by the refresh task.
    pub fn replace_batch(&self, class: SensorClass, batch: Vec<SensorReading>) {
        self.sensors.write().insert(class, batch);
    }

    pub fn latest(&self, class: SensorClass) -> Option<Vec<SensorReading>> {
        self.sensors.read().get(&class).cloned()
    }

    /// Upsert one reading by sensor id. Last write wins.
    pub fn ingest(&self, reading: SensorReading) {
        let mut sensors = self.sensors.write();
        let batch = sensors.entry(reading.class()).or_default();
        match batch.iter_mut().find(|r| r.sensor_id == reading.sensor_id) {
            Some(existing) => *existing = reading,
            None => batch.push(reading),
        }
    }

    pub fn is_known_sensor(&self, sensor_id: &str) -> bool {
        self.sensors
            .read()
            .values()
            .flatten()
            .any(|r| r.sensor_id == sensor_id)
    }

    pub fn sensor_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sensors
            .read()
            .values()
            .flatten()
            .map(|r| r.sensor_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Per-class field means over the latest batches.
    pub fn averages(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        let sensors = self.sensors.read();
        let mut report = BTreeMap::new();

        for (class, batch) in sensors.iter() {
            if batch.is_empty() {
                continue;
            }
            let mut sums: BTreeMap<&'static str, f64> = BTreeMap::new();
            for reading in batch {
                for (field, value) in reading.metrics.fields() {
                    *sums.entry(field).or_insert(0.0) += value;
                }
            }
            let n = batch.len() as f64;
            let means = sums
                .into_iter()
                .map(|(field, sum)| (field.to_string(), crate::sim::round2(sum / n)))
                .collect();
            report.insert(class.as_str().to_string(), means);
        }

        report
    }

    // ------------------------------------------------------------------
    // Detection state
    // ------------------------------------------------------------------

    pub fn observe_flood(
        &self,
        key: &str,
        threshold: Option<u32>,
        now: DateTime<Utc>,
    ) -> WindowDecision {
        let mut flood = self.flood.write();
        match threshold {
            Some(t) => flood.observe_with(key, t, now),
            None => flood.observe(key, now),
        }
    }

    pub fn observe_abuse(&self, key: &str, now: DateTime<Utc>) -> WindowDecision {
        self.abuse.write().observe(key, now)
    }

    pub fn validate_nonce(
        &self,
        nonce: &str,
        sent_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<NonceDecision, DetectError> {
        self.nonces.write().validate(nonce, sent_at, now)
    }

    pub fn verify_firmware(&self, sensor_id: &str, hash: &str) -> FirmwareDecision {
        self.firmware.write().verify(sensor_id, hash)
    }

    /// Forget windows, cooldowns and the firmware pin for one sensor.
    pub fn reset_sensor(&self, sensor_id: &str) {
        self.flood.write().reset(sensor_id);
        self.abuse.write().reset(sensor_id);
        self.firmware.write().reset(sensor_id);
    }

    /// Config hash pinned at boot, for the tamper-breach comparison.
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }

    // ------------------------------------------------------------------
    // Stream accounting
    // ------------------------------------------------------------------

    pub fn stream_opened(&self, label: &str) {
        *self.streams.write().entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn stream_closed(&self, label: &str) {
        let mut streams = self.streams.write();
        if let Some(count) = streams.get_mut(label) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn stream_counts(&self) -> BTreeMap<String, usize> {
        self.streams.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttackType, Severity};

    fn store() -> GatewayStore {
        let mut config = Config::from_env();
        config.log_capacity = 3;
        GatewayStore::new(&config, Vec::new())
    }

    fn entry(sensor_id: &str, blocked: bool) -> AttackLogEntry {
        AttackLogEntry::new(
            sensor_id,
            AttackType::Ddos,
            "test",
            if blocked { Severity::High } else { Severity::None },
            blocked,
        )
    }

    #[test]
    fn log_ring_enforces_capacity_newest_first() {
        let store = store();
        for i in 0..5 {
            store.record(entry(&format!("soil-{}", i), false));
        }

        let logs = store.logs(&LogFilter::default());
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].sensor_id, "soil-4");
        assert_eq!(logs[2].sensor_id, "soil-2");
    }

    #[test]
    fn log_filter_matches_blocked_and_sensor() {
        let store = store();
        store.record(entry("soil-1000", true));
        store.record(entry("water-3000", false));

        let filter = LogFilter {
            blocked: Some(true),
            ..Default::default()
        };
        let logs = store.logs(&filter);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].sensor_id, "soil-1000");

        let filter = LogFilter {
            sensor_id: Some("water-3000".to_string()),
            ..Default::default()
        };
        assert_eq!(store.logs(&filter).len(), 1);
    }

    #[test]
    fn alerts_only_return_blocked_entries() {
        let store = store();
        store.record(entry("soil-1000", false));
        store.record(entry("soil-1001", true));

        let alerts = store.alerts(10);
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].blocked);
    }

    #[test]
    fn ingest_is_last_write_wins() {
        let store = store();
        let batch = crate::sim::batch(SensorClass::Soil, 2);
        store.replace_batch(SensorClass::Soil, batch);

        let mut reading = crate::sim::generate(SensorClass::Soil, 0);
        reading.status = "compromised".to_string();
        store.ingest(reading.clone());

        let latest = store.latest(SensorClass::Soil).unwrap();
        assert_eq!(latest.len(), 2);
        let updated = latest.iter().find(|r| r.sensor_id == reading.sensor_id).unwrap();
        assert_eq!(updated.status, "compromised");
    }

    #[test]
    fn averages_cover_every_populated_class() {
        let store = store();
        store.replace_batch(SensorClass::Soil, crate::sim::batch(SensorClass::Soil, 5));
        store.replace_batch(SensorClass::Water, crate::sim::batch(SensorClass::Water, 5));

        let report = store.averages();
        assert_eq!(report.len(), 2);
        let soil = report.get("soil").unwrap();
        assert!(soil.contains_key("moisture"));
        let avg = soil["temperature"];
        assert!((15.0..=30.0).contains(&avg));
    }

    #[test]
    fn stream_counters_balance() {
        let store = store();
        store.stream_opened("alerts");
        store.stream_opened("alerts");
        store.stream_closed("alerts");

        assert_eq!(store.stream_counts()["alerts"], 1);
    }
}
