// handlers/public/status.rs - GET /api/status handler

use axum::extract::State;
use chrono::Utc;
use serde_json::{json, Value};

use crate::config::StoreBackendKind;
use crate::middleware::{ApiResponse, ApiResult};
use crate::AppState;

/// Liveness plus a store ping. A failed ping reports `degraded` with a 200 status.
pub async fn status_get(State(state): State<AppState>) -> ApiResult<Value> {
    let (status, store) = match state.store.ping().await {
        Ok(()) => ("ok", "connected"),
        Err(e) => {
            tracing::error!("Store ping failed: {}", e);
            ("degraded", "unreachable")
        }
    };

    let backend = match state.config.store.backend {
        StoreBackendKind::Postgres => "postgres",
        StoreBackendKind::Memory => "memory",
    };

    Ok(ApiResponse::success(json!({
        "status": status,
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "store": { "backend": backend, "status": store },
        "timestamp": Utc::now(),
    })))
}
