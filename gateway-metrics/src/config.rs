use serde::Deserialize;

/// Configuration for the OTLP metrics exporter. Carried as an ambient
/// surface the same way `LISTEN_ADDRESS` is, since every subsystem is
/// instrumented through OpenTelemetry regardless of which channels are
/// configured.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

const fn default_enabled() -> bool {
    false
}

fn default_endpoint() -> String {
    "http://localhost:4318/v1/metrics".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
        }
    }
}
