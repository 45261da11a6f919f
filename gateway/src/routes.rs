//! HTTP ingress: thin adapters producing pipeline inputs and reading
//! metrics, with a small `ApiResponse` envelope wrapping most handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use gateway_queue::QueueError;
use gateway_types::{Message, Priority};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::IngressError;
use crate::state::{AppState, ENQUEUE_TIMEOUT};

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
    pub data: serde_json::Value,
}

impl ApiResponse {
    fn ok(message: impl Into<String>, data: serde_json::Value) -> Self {
        ApiResponse { success: true, message: message.into(), data }
    }
}

#[derive(Debug, Deserialize)]
pub struct InboundSmsRequest {
    pub sender: String,
    pub body: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub sms_id: String,
    #[serde(default)]
    pub node_id: String,
    /// Accepted for request-shape parity with edge-device payloads, but
    /// never acted on: bodies pass through unmodified regardless of this
    /// flag.
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default = "default_priority_str")]
    pub priority: String,
}

fn default_priority_str() -> String {
    "normal".to_string()
}

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "Indian SIM SMS Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/docs",
        "health": "/api/health",
    }))
}

pub async fn receive_sms(
    State(state): State<Arc<AppState>>,
    Json(request): Json<InboundSmsRequest>,
) -> Result<Json<ApiResponse>, IngressError> {
    let message = Message::from_ingress(
        request.sms_id,
        request.sender,
        request.body,
        request.timestamp,
        request.node_id,
        Priority::from_request_str(&request.priority),
        state.max_retry_attempts,
    );
    let sms_id = message.sms_id.clone();

    let depth = state
        .queue
        .enqueue(message, ENQUEUE_TIMEOUT)
        .await
        .map_err(|err| match err {
            QueueError::Full => IngressError::QueueFull,
            QueueError::Closed => IngressError::NotReady,
        })?;

    gateway_common::incoming!(sms_id = %sms_id, "ingress accepted SMS");

    Ok(Json(ApiResponse::ok(
        format!("SMS {sms_id} enqueued for delivery"),
        json!({ "sms_id": sms_id, "queue_depth": depth }),
    )))
}

pub async fn receive_telemetry(
    State(state): State<Arc<AppState>>,
    Json(update): Json<gateway_telemetry::TelemetryUpdate>,
) -> impl IntoResponse {
    state.telemetry.update(update).await;
    Json(ApiResponse::ok("Telemetry recorded", json!({})))
}

pub async fn get_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.health.latest().await)
}

pub async fn list_dead_letters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let dead_letters = state.dlo.list_all().await;
    let count = dead_letters.len();
    Json(ApiResponse::ok(
        format!("{count} dead-lettered messages"),
        json!({ "dead_letters": dead_letters, "count": count }),
    ))
}

pub async fn retry_dead_letter(
    State(state): State<Arc<AppState>>,
    Path(sms_id): Path<String>,
) -> Result<Json<ApiResponse>, IngressError> {
    let queue = Arc::clone(&state.queue);
    let reinjected = state
        .dlo
        .retry(&sms_id, move |message| {
            let queue = Arc::clone(&queue);
            async move { queue.enqueue(message, ENQUEUE_TIMEOUT).await.is_ok() }
        })
        .await;

    if reinjected {
        Ok(Json(ApiResponse::ok(format!("SMS {sms_id} re-enqueued from DLO"), json!({}))))
    } else {
        Err(IngressError::DlNotFound(sms_id))
    }
}

pub async fn purge_dead_letters(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let purged = state.dlo.purge_all().await;
    Json(ApiResponse::ok(format!("Purged {purged} dead letters"), json!({ "purged": purged })))
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.metrics.snapshot().await)
}

#[derive(Debug, Deserialize)]
pub struct IncidentsQuery {
    #[serde(default = "default_incidents_limit")]
    pub limit: usize,
}

fn default_incidents_limit() -> usize {
    20
}

pub async fn get_incidents(State(state): State<Arc<AppState>>, Query(query): Query<IncidentsQuery>) -> impl IntoResponse {
    let incidents = state.incident.recent(query.limit).await;
    Json(json!({ "incidents": incidents, "count": incidents.len() }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use gateway_dispatch::{EmailDispatcher, TelegramDispatcher};
    use gateway_dlo::DeadLetterStore;
    use gateway_health::HealthEvaluator;
    use gateway_incident::IncidentEngine;
    use gateway_metrics::MetricsAggregator;
    use gateway_queue::DeliveryQueue;
    use gateway_telemetry::TelemetryRegistry;
    use gateway_worker::WorkerPool;

    use super::*;

    fn test_state() -> Arc<AppState> {
        let queue = DeliveryQueue::new(10);
        let telemetry = TelemetryRegistry::new();
        let incident = Arc::new(IncidentEngine::new(None, None, Duration::from_secs(300)));
        let health = HealthEvaluator::new(
            Arc::clone(&telemetry),
            Arc::clone(&queue),
            10,
            gateway_health::HealthConfig::default(),
            Some(Arc::clone(&incident) as Arc<dyn gateway_health::AlertListener>),
        );
        let telegram = Arc::new(TelegramDispatcher::new(Default::default()));
        let email = Arc::new(EmailDispatcher::new(Default::default()));
        let dlo = Arc::new(DeadLetterStore::new(None, Duration::from_secs(1)));
        let worker_pool = WorkerPool::new(
            Arc::clone(&queue),
            vec![Arc::clone(&telegram) as Arc<dyn gateway_dispatch::Dispatcher>],
            None,
            Arc::clone(&dlo) as Arc<dyn gateway_worker::DeadLetterSink>,
            1,
        );
        let telegram_clone = Arc::clone(&telegram);
        let email_clone = Arc::clone(&email);
        let metrics = Arc::new(MetricsAggregator::new(
            Arc::clone(&queue),
            worker_pool.metrics(),
            Arc::new(move || telegram_clone.metrics()),
            Arc::new(move || email_clone.metrics()),
            Arc::clone(&dlo),
            Arc::clone(&incident),
        ));

        Arc::new(AppState {
            queue,
            queue_max_size: 10,
            max_retry_attempts: 5,
            worker_pool,
            telegram,
            email,
            dlo,
            telemetry,
            health,
            incident,
            metrics,
        })
    }

    #[tokio::test]
    async fn receive_sms_enqueues_and_reports_depth() {
        let state = test_state();
        let request = InboundSmsRequest {
            sender: "+911234567890".into(),
            body: "your otp is 123456".into(),
            timestamp: String::new(),
            sms_id: String::new(),
            node_id: "node-1".into(),
            encrypted: false,
            priority: "high".into(),
        };

        let response = receive_sms(State(state.clone()), Json(request)).await.unwrap().0;
        assert!(response.success);
        assert_eq!(state.queue.depth().await, 1);
        assert_eq!(state.queue.total_enqueued(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn receive_sms_rejects_when_queue_full() {
        let state = test_state();
        for i in 0..10 {
            let msg = gateway_types::Message::from_ingress(
                format!("id-{i}"),
                "+91".into(),
                "otp".into(),
                "t".into(),
                "n".into(),
                gateway_types::Priority::Normal,
                5,
            );
            state.queue.enqueue(msg, Duration::from_millis(10)).await.unwrap();
        }

        let request = InboundSmsRequest {
            sender: "+91".into(),
            body: "overflow".into(),
            timestamp: String::new(),
            sms_id: String::new(),
            node_id: "node-1".into(),
            encrypted: false,
            priority: "normal".into(),
        };

        let err = receive_sms(State(state), Json(request)).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn retry_dead_letter_reports_404_when_missing() {
        let state = test_state();
        let err = retry_dead_letter(State(state), Path("ghost".to_string())).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_incidents_defaults_to_twenty() {
        let state = test_state();
        let _ = get_incidents(State(state), Query(IncidentsQuery { limit: 20 })).await;
    }
}
