use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors the ingress layer itself can reject a request for. Everything
/// downstream absorbs failures into retry/fallback/DLO and never surfaces
/// them here.
#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("queue is full, backpressure active")]
    QueueFull,
    #[error("pipeline is shutting down")]
    NotReady,
    #[error("{0} not found in DLO")]
    DlNotFound(String),
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = match &self {
            IngressError::QueueFull => StatusCode::TOO_MANY_REQUESTS,
            IngressError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            IngressError::DlNotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "success": false, "message": self.to_string(), "data": {} }))).into_response()
    }
}
