// handlers/protected/users/mod.rs - User management within the caller's organization

pub mod create;
pub mod delete;
pub mod list;
pub mod show;
pub mod stats;
pub mod toggle_status;
pub mod update;

use axum::{
    handler::Handler,
    middleware::from_fn_with_state,
    routing::{get, patch},
    Router,
};

use crate::middleware::{authorize, Gate, CLINIC_MANAGERS};
use crate::permissions::Permission;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    let read = Gate::Permission(Permission::UsersRead);
    let update = Gate::Permission(Permission::UsersUpdate);

    Router::new()
        .route(
            "/api/users",
            get(list::users_get.layer(from_fn_with_state(read, authorize))).post(
                create::users_post.layer(from_fn_with_state(Gate::Permission(Permission::UsersCreate), authorize)),
            ),
        )
        .route(
            "/api/users/stats",
            get(stats::users_stats_get.layer(from_fn_with_state(Gate::Roles(CLINIC_MANAGERS), authorize))),
        )
        .route(
            "/api/users/:id",
            get(show::user_get.layer(from_fn_with_state(read, authorize)))
                .put(update::user_put.layer(from_fn_with_state(update, authorize)))
                .delete(delete::user_delete.layer(from_fn_with_state(Gate::Permission(Permission::UsersDelete), authorize))),
        )
        .route(
            "/api/users/:id/toggle-status",
            patch(toggle_status::user_toggle_status_patch.layer(from_fn_with_state(update, authorize))),
        )
}
