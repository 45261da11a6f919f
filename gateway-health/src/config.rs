use std::time::Duration;

/// Tunables for the health evaluator, sourced from process configuration.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub check_interval: Duration,
    pub battery_low_threshold: i32,
    pub signal_low_threshold: i32,
    pub heartbeat_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            check_interval: Duration::from_secs(30),
            battery_low_threshold: 20,
            signal_low_threshold: -100,
            heartbeat_timeout: Duration::from_secs(120),
        }
    }
}
