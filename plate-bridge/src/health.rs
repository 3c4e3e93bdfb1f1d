use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct BridgeHealth {
    pub uptime_seconds: u64,
    pub devices_tracked: u32,
    pub viewers_connected: u32,
    pub mqtt_status: String,
    pub mqtt_reconnects: u32,
}

/// Suivi de l'état du pont, alimenté par le listener MQTT.
#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    mqtt_reconnects: Arc<AtomicU32>,
    mqtt_status: Arc<Mutex<String>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            mqtt_reconnects: Arc::new(AtomicU32::new(0)),
            mqtt_status: Arc::new(Mutex::new("connecting".to_string())),
        }
    }

    pub fn mark_mqtt_connected(&self) {
        *self.mqtt_status.lock() = "connected".to_string();
    }

    pub fn increment_reconnects(&self) {
        self.mqtt_reconnects.fetch_add(1, Ordering::Relaxed);
        *self.mqtt_status.lock() = "reconnecting".to_string();
    }

    pub fn get_health(&self, devices_tracked: usize, viewers_connected: usize) -> BridgeHealth {
        BridgeHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            devices_tracked: devices_tracked as u32,
            viewers_connected: viewers_connected as u32,
            mqtt_status: self.mqtt_status.lock().clone(),
            mqtt_reconnects: self.mqtt_reconnects.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let tracker = HealthTracker::new();
        assert_eq!(tracker.get_health(0, 0).mqtt_status, "connecting");

        tracker.mark_mqtt_connected();
        assert_eq!(tracker.get_health(0, 0).mqtt_status, "connected");

        tracker.increment_reconnects();
        let health = tracker.get_health(3, 2);
        assert_eq!(health.mqtt_status, "reconnecting");
        assert_eq!(health.mqtt_reconnects, 1);
        assert_eq!(health.devices_tracked, 3);
        assert_eq!(health.viewers_connected, 2);
    }
}
