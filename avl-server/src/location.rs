//! Last known location per device.
//!
//! Every accepted report replaces the previous entry for the same device, so
//! the store holds at most one location per device identifier. The map view
//! polls it for devices that reported recently.

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_DEVICE_MODEL: &str = "Unknown";

/// Latest report of a single device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceLocation {
    #[serde(rename = "android_id")]
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
    pub battery_level: f64,
    pub device_model: String,
    /// Time the report was received
    pub timestamp: DateTime<Utc>,
}

/// In-memory upsert store keyed by device identifier
#[derive(Debug, Default)]
pub struct LocationStore {
    devices: HashMap<String, DeviceLocation>,
}

impl LocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `location.device_id`.
    ///
    /// Returns true if the device was not known before.
    pub fn upsert(&mut self, location: DeviceLocation) -> bool {
        let device_id = location.device_id.clone();
        let is_new = self.devices.insert(device_id.clone(), location).is_none();
        if is_new {
            debug!("New device reporting: {}", device_id);
        }
        is_new
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceLocation> {
        self.devices.get(device_id)
    }

    /// Devices that reported at or after `now - window`, ordered by identifier
    pub fn active_within(&self, now: DateTime<Utc>, window: Duration) -> Vec<DeviceLocation> {
        let threshold = now - window;
        let mut active: Vec<DeviceLocation> = self
            .devices
            .values()
            .filter(|d| d.timestamp >= threshold)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        active
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn location(id: &str, latitude: f64, timestamp: DateTime<Utc>) -> DeviceLocation {
        DeviceLocation {
            device_id: id.to_string(),
            latitude,
            longitude: 51.4,
            speed: 0.0,
            battery_level: 80.0,
            device_model: DEFAULT_DEVICE_MODEL.to_string(),
            timestamp,
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_upsert_replaces() {
        let mut store = LocationStore::new();
        assert!(store.upsert(location("a", 35.0, t(0))));
        assert!(!store.upsert(location("a", 36.0, t(10))));

        assert_eq!(store.len(), 1);
        let entry = store.get("a").unwrap();
        assert_eq!(entry.latitude, 36.0);
        assert_eq!(entry.timestamp, t(10));
    }

    #[test]
    fn test_active_within_window() {
        let mut store = LocationStore::new();
        store.upsert(location("old", 35.0, t(0)));
        store.upsert(location("edge", 35.0, t(100)));
        store.upsert(location("fresh", 35.0, t(350)));

        let active = store.active_within(t(400), Duration::seconds(300));
        let ids: Vec<&str> = active.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["edge", "fresh"]);
    }

    #[test]
    fn test_serializes_with_client_field_names() {
        let json = serde_json::to_value(location("a", 35.0, t(0))).unwrap();
        assert_eq!(json["android_id"], "a");
        assert_eq!(json["battery_level"], 80.0);
        assert!(json["timestamp"].as_str().unwrap().starts_with("2023-11-14T"));
    }
}
