//! Telemetry registry: the latest sample received from each edge node,
//! merged field-by-field so a partial update never clobbers values the
//! caller didn't supply.

use std::collections::HashMap;
use std::sync::Arc;

use gateway_types::NodeTelemetry;
use serde::Deserialize;
use tokio::sync::RwLock;

/// Inbound telemetry payload (`POST /api/telemetry`). Every field besides
/// `node_id` is optional. An absent field leaves the stored value
/// untouched: updates merge rather than overwrite.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetryUpdate {
    pub node_id: String,
    pub battery_mv: Option<i32>,
    pub wifi_rssi: Option<i32>,
    pub wifi_state: Option<i32>,
    pub reconnects: Option<i32>,
    pub wdt_resets: Option<i32>,
    pub stored_sms_ids: Option<i32>,
    pub uptime_sec: Option<i64>,
    pub heap_free: Option<i64>,
}

/// Per-node latest-sample store. All access is serialized through a single
/// lock: mutation only happens on the telemetry-ingress path, reads only
/// happen from the health evaluator.
pub struct TelemetryRegistry {
    nodes: RwLock<HashMap<String, NodeTelemetry>>,
}

impl TelemetryRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(TelemetryRegistry {
            nodes: RwLock::new(HashMap::new()),
        })
    }

    /// Merges `update` into the per-node record, auto-registering the
    /// node on first contact, and refreshes `last_seen` to now.
    pub async fn update(&self, update: TelemetryUpdate) {
        let mut nodes = self.nodes.write().await;
        let node = nodes
            .entry(update.node_id.clone())
            .or_insert_with(|| NodeTelemetry::new(update.node_id.clone()));

        if let Some(v) = update.battery_mv {
            node.battery_mv = v;
        }
        if let Some(v) = update.wifi_rssi {
            node.wifi_rssi = v;
        }
        if let Some(v) = update.wifi_state {
            node.wifi_state = v;
        }
        if let Some(v) = update.reconnects {
            node.reconnects = v;
        }
        if let Some(v) = update.wdt_resets {
            node.wdt_resets = v;
        }
        if let Some(v) = update.stored_sms_ids {
            node.stored_sms_ids = v;
        }
        if let Some(v) = update.uptime_sec {
            node.uptime_sec = v;
        }
        if let Some(v) = update.heap_free {
            node.heap_free = v;
        }
        node.touch();

        gateway_common::incoming!(node_id = %node.node_id, "telemetry updated");
    }

    /// Read-only view of every registered node, for the health evaluator.
    pub async fn snapshot(&self) -> Vec<NodeTelemetry> {
        self.nodes.read().await.values().cloned().collect()
    }

    pub async fn get(&self, node_id: &str) -> Option<NodeTelemetry> {
        self.nodes.read().await.get(node_id).cloned()
    }

    pub async fn node_count(&self) -> usize {
        self.nodes.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_update_auto_registers_the_node() {
        let registry = TelemetryRegistry::new();
        registry
            .update(TelemetryUpdate {
                node_id: "node-1".into(),
                battery_mv: Some(3800),
                ..Default::default()
            })
            .await;

        assert_eq!(registry.node_count().await, 1);
        let node = registry.get("node-1").await.unwrap();
        assert_eq!(node.battery_mv, 3800);
    }

    #[tokio::test]
    async fn partial_update_retains_prior_values() {
        let registry = TelemetryRegistry::new();
        registry
            .update(TelemetryUpdate {
                node_id: "node-1".into(),
                battery_mv: Some(3800),
                wifi_rssi: Some(-60),
                ..Default::default()
            })
            .await;
        registry
            .update(TelemetryUpdate {
                node_id: "node-1".into(),
                wdt_resets: Some(2),
                ..Default::default()
            })
            .await;

        let node = registry.get("node-1").await.unwrap();
        assert_eq!(node.battery_mv, 3800);
        assert_eq!(node.wifi_rssi, -60);
        assert_eq!(node.wdt_resets, 2);
    }

    #[tokio::test]
    async fn unknown_node_returns_none() {
        let registry = TelemetryRegistry::new();
        assert!(registry.get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn snapshot_reflects_all_registered_nodes() {
        let registry = TelemetryRegistry::new();
        registry
            .update(TelemetryUpdate { node_id: "a".into(), ..Default::default() })
            .await;
        registry
            .update(TelemetryUpdate { node_id: "b".into(), ..Default::default() })
            .await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 2);
    }
}
