// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Liveness and token acquisition. Every input here comes from an anonymous
// caller and is validated by the services before touching the store.

pub mod auth;
pub mod status;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(status::status_get))
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/register-organization", post(auth::register_organization_post))
        .route("/api/auth/login", post(auth::login_post))
}
