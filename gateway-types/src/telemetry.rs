use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Sentinel RSSI value meaning "no reading available". Never itself
/// treated as a weak-signal condition.
pub const RSSI_UNKNOWN: i32 = -127;

/// Latest telemetry sample received from one edge node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTelemetry {
    pub node_id: String,
    pub battery_mv: i32,
    pub wifi_rssi: i32,
    pub wifi_state: i32,
    pub reconnects: i32,
    pub wdt_resets: i32,
    pub stored_sms_ids: i32,
    pub uptime_sec: i64,
    pub heap_free: i64,
    pub last_seen: f64,
}

impl NodeTelemetry {
    pub fn new(node_id: String) -> Self {
        NodeTelemetry {
            node_id,
            battery_mv: 0,
            wifi_rssi: RSSI_UNKNOWN,
            wifi_state: 0,
            reconnects: 0,
            wdt_resets: 0,
            stored_sms_ids: 0,
            uptime_sec: 0,
            heap_free: 0,
            last_seen: unix_seconds(),
        }
    }

    /// Linear estimate from battery millivolts: 3000mV = 0%, 4200mV = 100%.
    pub fn battery_percent(&self) -> u8 {
        if self.battery_mv <= 3000 {
            return 0;
        }
        if self.battery_mv >= 4200 {
            return 100;
        }
        gateway_common::clamp_percent(((self.battery_mv - 3000) / 12) as i64)
    }

    pub fn touch(&mut self) {
        self.last_seen = unix_seconds();
    }
}

fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_percent_clamps_at_bounds() {
        let mut node = NodeTelemetry::new("n1".into());
        node.battery_mv = 2500;
        assert_eq!(node.battery_percent(), 0);
        node.battery_mv = 4500;
        assert_eq!(node.battery_percent(), 100);
    }

    #[test]
    fn battery_percent_exactly_at_threshold_is_not_low() {
        // 3000 + 20*12 = 3240mV yields exactly 20%.
        let mut node = NodeTelemetry::new("n1".into());
        node.battery_mv = 3240;
        assert_eq!(node.battery_percent(), 20);
    }

    #[test]
    fn rssi_sentinel_is_not_a_reading() {
        let node = NodeTelemetry::new("n1".into());
        assert_eq!(node.wifi_rssi, RSSI_UNKNOWN);
    }
}
