// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (bearer token, most routes also organization
// scope) → Elevated (system owner only)

pub mod elevated;
pub mod protected;
pub mod public;

use std::any::Any;

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    Router,
};
use serde_json::json;

use crate::error::ApiError;
use crate::AppState;

/// Every route of the API, ready to serve
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(public::routes())
        .merge(protected::routes(state.clone()))
        .merge(elevated::routes(state.clone()))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}

/// Converts a handler panic into the standard JSON error body
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "message": "An unexpected error occurred",
            "code": "INTERNAL_SERVER_ERROR"
        })),
    )
        .into_response()
}
