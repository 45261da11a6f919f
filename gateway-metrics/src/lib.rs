//! Aggregated metrics: a serde-friendly snapshot for `GET /api/metrics`
//! plus OpenTelemetry observable instruments pushed to an OTLP collector.

mod config;
mod error;
mod exporter;
mod instruments;
mod snapshot;

use std::sync::Arc;
use std::time::Duration;

pub use config::MetricsConfig;
pub use error::MetricsError;
pub use instruments::GatewayInstruments;
pub use snapshot::{MetricsAggregator, MetricsSnapshot, QueueMetricsSnapshot};
use tokio::task::JoinHandle;

/// How often the OTel instruments refresh from the live aggregator.
const REFRESH_INTERVAL: Duration = Duration::from_secs(15);

/// Installs the OTLP exporter as the global meter provider and starts the
/// background refresh task. A no-op (returns `None`) when `config.enabled`
/// is false.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be built.
pub fn init_metrics(
    config: &MetricsConfig,
    aggregator: Arc<MetricsAggregator>,
) -> Result<Option<(Arc<GatewayInstruments>, JoinHandle<()>)>, MetricsError> {
    if !config.enabled {
        tracing::info!("metrics collection is disabled");
        return Ok(None);
    }

    tracing::info!(endpoint = %config.endpoint, "initializing OpenTelemetry metrics with OTLP exporter");
    let provider = exporter::init_otlp_exporter(&config.endpoint)?;
    opentelemetry::global::set_meter_provider(provider);

    let instruments = Arc::new(GatewayInstruments::new());
    let handle = instruments.spawn_refresh(aggregator, REFRESH_INTERVAL);

    tracing::info!("metrics collection initialized");
    Ok(Some((instruments, handle)))
}
