// handlers/protected/patients/mod.rs - Patient records of the caller's organization
//
// Patients are never hard-deleted; toggle-status is the soft delete.

pub mod create;
pub mod list;
pub mod search;
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
    let read = Gate::RoleOrPermission(CLINIC_MANAGERS, Permission::PatientsRead);
    let create = Gate::RoleOrPermission(CLINIC_MANAGERS, Permission::PatientsCreate);
    let update = Gate::RoleOrPermission(CLINIC_MANAGERS, Permission::PatientsUpdate);

    Router::new()
        .route(
            "/api/patients",
            get(list::patients_get.layer(from_fn_with_state(read, authorize)))
                .post(create::patients_post.layer(from_fn_with_state(create, authorize))),
        )
        .route(
            "/api/patients/search",
            get(search::patients_search_get.layer(from_fn_with_state(read, authorize))),
        )
        .route(
            "/api/patients/stats",
            get(stats::patients_stats_get.layer(from_fn_with_state(read, authorize))),
        )
        .route(
            "/api/patients/:id",
            get(show::patient_get.layer(from_fn_with_state(read, authorize)))
                .put(update::patient_put.layer(from_fn_with_state(update, authorize))),
        )
        .route(
            "/api/patients/:id/toggle-status",
            patch(toggle_status::patient_toggle_status_patch.layer(from_fn_with_state(update, authorize))),
        )
}
