//! OTLP metrics exporter setup.

use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;

use crate::MetricsError;

/// Builds an OTLP/HTTP exporter and wraps it in a periodic-reader meter
/// provider. Does not install it globally; the caller decides when to do
/// that via [`opentelemetry::global::set_meter_provider`].
pub fn init_otlp_exporter(endpoint: &str) -> Result<SdkMeterProvider, MetricsError> {
    tracing::info!(endpoint = %endpoint, "configuring OTLP metrics exporter");

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|err| {
            tracing::error!(endpoint = %endpoint, error = %err, "failed to build OTLP exporter");
            MetricsError::OpenTelemetry(err.to_string())
        })?;

    let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter).build();
    let provider = SdkMeterProvider::builder().with_reader(reader).build();

    tracing::info!("OTLP metrics exporter initialized");
    Ok(provider)
}
