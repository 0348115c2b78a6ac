// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Two groups share this tier:
//   * account routes need only an authenticated, active user
//   * tenant routes additionally need an active organization with a live
//     subscription, and see only that organization's rows
//
// Per-route gates sit inside both layers, so they always see an
// authenticated caller.

pub mod auth;
pub mod organizations;
pub mod patients;
pub mod users;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, put},
    Router,
};

use crate::middleware::{authenticate, require_organization};
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let account = Router::new()
        .route("/api/auth/profile", get(auth::profile_get).put(auth::profile_put))
        .route("/api/auth/password", put(auth::password_put))
        .route(
            "/api/organizations/:id",
            get(organizations::organization_get).put(organizations::organization_put),
        )
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    // Layers run bottom-up: authenticate, then require_organization
    let tenant = Router::new()
        .merge(users::routes())
        .merge(patients::routes())
        .route("/api/organizations/my", get(organizations::my_get))
        .route("/api/organizations/my/stats", get(organizations::my_stats_get))
        .route_layer(from_fn_with_state(state.clone(), require_organization))
        .route_layer(from_fn_with_state(state, authenticate));

    account.merge(tenant)
}
