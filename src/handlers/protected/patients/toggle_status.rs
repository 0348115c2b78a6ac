// handlers/protected/patients/toggle_status.rs - PATCH /api/patients/:id/toggle-status handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidPath};
use crate::services::PatientService;
use crate::AppState;

pub async fn patient_toggle_status_patch(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Value> {
    let patient = PatientService::new(&state, caller, scope).toggle_status(id).await?;
    let message = if patient.is_active { "Patient activated" } else { "Patient deactivated" };
    Ok(ApiResponse::success(json!({ "patient": patient, "message": message })))
}
