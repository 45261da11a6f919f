//! Process entry point: constructs every component in dependency order,
//! serves the HTTP ingress, and tears down the same components in reverse
//! on shutdown.

mod error;
mod routes;
mod settings;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use gateway_common::{Signal, internal};
use gateway_dispatch::{Dispatcher, EmailConfig, EmailDispatcher, TelegramConfig, TelegramDispatcher};
use gateway_dlo::{DeadLetterStore, RedisBackend};
use gateway_health::{HealthConfig, HealthEvaluator};
use gateway_incident::IncidentEngine;
use gateway_metrics::MetricsAggregator;
use gateway_queue::DeliveryQueue;
use gateway_telemetry::TelemetryRegistry;
use gateway_worker::WorkerPool;
use settings::Settings;
use state::AppState;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// How long [`WorkerPool::stop`] waits for in-flight and queued messages to
/// drain before aborting stragglers.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the dead-letter store's TTL sweep runs. The store itself does
/// not loop `purge_expired` internally, so this is its schedule.
const DLO_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gateway_common::logging::init();
    internal!("Indian SIM SMS Gateway starting up");

    let settings = Settings::load()?;

    let telegram = Arc::new(TelegramDispatcher::new(TelegramConfig {
        bot_token: settings.telegram_bot_token.clone(),
        chat_id: settings.telegram_chat_id.clone(),
        ..Default::default()
    }));
    let email = Arc::new(EmailDispatcher::new(EmailConfig {
        smtp_host: settings.smtp_host.clone(),
        smtp_port: settings.smtp_port,
        username: settings.smtp_username.clone(),
        password: settings.smtp_password.clone(),
        recipient: settings.email_recipient.clone(),
        ..Default::default()
    }));

    let persistent_dlo = if settings.redis_url.is_empty() {
        None
    } else {
        match RedisBackend::connect(&settings.redis_url).await {
            Ok(backend) => Some(Arc::new(backend) as Arc<dyn gateway_dlo::DloBackend>),
            Err(err) => {
                internal!(error = %err, "redis DLO backend unavailable, falling back to in-memory store");
                None
            }
        }
    };
    let dlo = Arc::new(DeadLetterStore::new(
        persistent_dlo,
        Duration::from_secs(settings.dlo_ttl_hours * 3600),
    ));

    let incident = Arc::new(IncidentEngine::new(
        non_empty(&settings.n8n_webhook_url),
        non_empty(&settings.n8n_webhook_secret),
        Duration::from_secs(settings.alert_cooldown_seconds),
    ));

    let telemetry = TelemetryRegistry::new();
    let queue = DeliveryQueue::new(settings.queue_max_size);

    let health = HealthEvaluator::new(
        Arc::clone(&telemetry),
        Arc::clone(&queue),
        settings.queue_max_size,
        HealthConfig {
            check_interval: Duration::from_secs(settings.health_check_interval_seconds),
            battery_low_threshold: settings.battery_low_threshold,
            signal_low_threshold: settings.signal_low_threshold,
            heartbeat_timeout: Duration::from_secs(settings.heartbeat_timeout_seconds),
        },
        Some(Arc::clone(&incident) as Arc<dyn gateway_health::AlertListener>),
    );

    let worker_pool = WorkerPool::new(
        Arc::clone(&queue),
        vec![Arc::clone(&telegram) as Arc<dyn Dispatcher>],
        Some(Arc::clone(&email) as Arc<dyn Dispatcher>),
        Arc::clone(&dlo) as Arc<dyn gateway_worker::DeadLetterSink>,
        settings.consumer_concurrency,
    );

    let telegram_for_metrics = Arc::clone(&telegram);
    let email_for_metrics = Arc::clone(&email);
    let metrics = Arc::new(MetricsAggregator::new(
        Arc::clone(&queue),
        worker_pool.metrics(),
        Arc::new(move || telegram_for_metrics.metrics()),
        Arc::new(move || email_for_metrics.metrics()),
        Arc::clone(&dlo),
        Arc::clone(&incident),
    ));

    let metrics_config = gateway_metrics::MetricsConfig::default();
    let otel = gateway_metrics::init_metrics(&metrics_config, Arc::clone(&metrics))?;

    let app_state = Arc::new(AppState {
        queue: Arc::clone(&queue),
        queue_max_size: settings.queue_max_size,
        max_retry_attempts: settings.max_retry_attempts,
        worker_pool: Arc::clone(&worker_pool),
        telegram,
        email,
        dlo: Arc::clone(&dlo),
        telemetry,
        health: Arc::clone(&health),
        incident,
        metrics,
    });

    let worker_handles = worker_pool.serve();

    let (shutdown_tx, shutdown_rx) = watch::channel(Signal::Finalised);
    let health_task = tokio::spawn(Arc::clone(&health).run(shutdown_rx));

    let purge_dlo = Arc::clone(&dlo);
    let purge_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(DLO_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = purge_dlo.purge_expired().await;
            if purged > 0 {
                internal!(purged, "swept expired dead letters");
            }
        }
    });

    let router = Router::new()
        .route("/", get(routes::root))
        .route("/api/sms/inbound", post(routes::receive_sms))
        .route("/api/telemetry", post(routes::receive_telemetry))
        .route("/api/health", get(routes::get_health))
        .route("/api/dlo", get(routes::list_dead_letters).delete(routes::purge_dead_letters))
        .route("/api/dlo/{sms_id}/retry", post(routes::retry_dead_letter))
        .route("/api/metrics", get(routes::get_metrics))
        .route("/api/incidents", get(routes::get_incidents))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = TcpListener::bind(&settings.listen_address).await?;
    internal!(address = %settings.listen_address, "all systems initialized");

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(Signal::Shutdown);
    purge_task.abort();
    let _ = health_task.await;
    let undelivered = worker_pool.stop(worker_handles, DRAIN_TIMEOUT).await;
    if undelivered > 0 {
        internal!(undelivered, "left messages queued at shutdown");
    }
    if let Some((_, refresh_task)) = otel {
        refresh_task.abort();
    }

    internal!("shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() { None } else { Some(value.to_string()) }
}
