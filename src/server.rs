//! HTTP control surface for the monitor.
//!
//! Each route is a thin translation onto a [`Monitor`] call. Control errors
//! map to 409 (wrong state) or 400 (bad configuration) with a JSON
//! `{"error": ...}` body.

use crate::config::{MonitorConfig, StartDefaults};
use crate::error::ControlError;
use crate::monitor::{Monitor, MonitorStatus};
use crate::offer::Offer;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Shared state of the control routes
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub defaults: Arc<StartDefaults>,
}

impl AppState {
    pub fn new(monitor: Arc<Monitor>, defaults: StartDefaults) -> Self {
        Self {
            monitor,
            defaults: Arc::new(defaults),
        }
    }
}

/// Body of a start request; omitted fields fall back to the service defaults
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default, alias = "whatsapp")]
    pub recipient: Option<String>,

    #[serde(default)]
    pub urls: Option<Vec<String>>,

    #[serde(default, alias = "intervalo")]
    pub interval_seconds: Option<u64>,

    #[serde(default)]
    pub discount_min: Option<u8>,

    #[serde(default)]
    pub discount_max: Option<u8>,
}

impl StartRequest {
    pub fn into_config(self, defaults: &StartDefaults) -> MonitorConfig {
        MonitorConfig {
            recipient: self
                .recipient
                .or_else(|| defaults.recipient.clone())
                .unwrap_or_default(),
            urls: self.urls.unwrap_or_else(|| defaults.urls.clone()),
            interval_secs: self.interval_seconds.unwrap_or(defaults.interval_secs),
            discount_min: self.discount_min.unwrap_or(defaults.discount_min),
            discount_max: self.discount_max.unwrap_or(defaults.discount_max),
        }
    }
}

#[derive(Debug, Serialize)]
struct OffersResponse {
    offers: Vec<Offer>,
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = match self {
            ControlError::AlreadyRunning | ControlError::NotRunning | ControlError::Stopping => {
                StatusCode::CONFLICT
            }
            ControlError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        };
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/start", post(start))
        .route("/api/stop", post(stop))
        .route("/api/status", get(status))
        .route("/api/offers", get(offers))
        .with_state(state)
}

async fn start(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ControlError> {
    // An empty body starts with the defaults
    let request: StartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ControlError::InvalidConfig(format!("malformed request body: {e}")))?
    };

    state
        .monitor
        .start(request.into_config(&state.defaults))
        .await?;
    Ok(Json(json!({ "status": "started" })))
}

async fn stop(State(state): State<AppState>) -> Result<Json<Value>, ControlError> {
    state.monitor.stop().await?;
    Ok(Json(json!({ "status": "stopped" })))
}

async fn status(State(state): State<AppState>) -> Json<MonitorStatus> {
    Json(state.monitor.status())
}

async fn offers(State(state): State<AppState>) -> Json<OffersResponse> {
    Json(OffersResponse {
        offers: state.monitor.recent_offers(),
    })
}
