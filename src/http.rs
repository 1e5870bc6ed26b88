//! HTTP endpoints: health, Prometheus metrics and the Bot API webhook.
//!
//! Both listeners run on separate tokio tasks. The health listener serves
//! `/health` and `/metrics`; the webhook listener accepts
//! `POST /webhook/<token>` and feeds decoded updates into the manager's
//! update channel. Requests carrying another token get 404.

use crate::manager::Manager;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lexparty_proto::Update;
use lexparty_proto::telegram::RawUpdate;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    matches: usize,
    building: usize,
}

async fn health(State(manager): State<Arc<Manager>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        matches: manager.match_count(),
        building: manager.building_count(),
    })
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

pub fn health_router(manager: Arc<Manager>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .with_state(manager)
}

#[derive(Clone)]
struct WebhookState {
    tx: mpsc::Sender<Update>,
    token: Arc<str>,
}

async fn webhook(
    State(state): State<WebhookState>,
    Path(token): Path<String>,
    Json(raw): Json<RawUpdate>,
) -> StatusCode {
    if token != *state.token {
        warn!("Webhook call with a foreign token rejected");
        return StatusCode::NOT_FOUND;
    }
    let update_id = raw.update_id;
    let Some(update) = raw.into_update() else {
        debug!(update_id, "Unhandled update kind skipped");
        return StatusCode::OK;
    };
    match state.tx.send(update).await {
        Ok(()) => StatusCode::OK,
        // Makes the Bot API redeliver once the daemon is back.
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// URL to register with the Bot API for the webhook route.
pub fn webhook_url(public_url: &str, token: &str) -> String {
    format!("{}/webhook/{token}", public_url.trim_end_matches('/'))
}

pub fn webhook_router(tx: mpsc::Sender<Update>, token: &str) -> Router {
    Router::new()
        .route("/webhook/:token", post(webhook))
        .with_state(WebhookState {
            tx,
            token: Arc::from(token),
        })
}

/// Serve `app` on `addr` until `shutdown` fires.
pub async fn serve(name: &'static str, addr: SocketAddr, app: Router, shutdown: CancellationToken) {
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(server = name, %addr, error = %e, "Failed to bind HTTP server");
            return;
        }
    };
    info!(server = name, %addr, "HTTP server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        warn!(server = name, error = %e, "HTTP server error");
    }
}
