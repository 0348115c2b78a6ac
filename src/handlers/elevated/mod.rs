// handlers/elevated/mod.rs - Elevated handlers (system owner only)
//
// Cross-tenant administration. The caller must be an owner account that
// belongs to no organization; such accounts are created with
// `dentcare bootstrap-owner`.

pub mod organizations;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, patch},
    Router,
};

use crate::middleware::{authenticate, authorize, Gate};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/organizations",
            get(organizations::organizations_get).post(organizations::organizations_post),
        )
        .route("/api/organizations/stats", get(organizations::organizations_stats_get))
        .route("/api/organizations/:id", delete(organizations::organization_delete))
        .route(
            "/api/organizations/:id/toggle-status",
            patch(organizations::organization_toggle_status_patch),
        )
        .route_layer(from_fn_with_state(Gate::System, authorize))
        .route_layer(from_fn_with_state(state, authenticate))
}
