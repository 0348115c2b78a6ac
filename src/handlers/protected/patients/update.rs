// handlers/protected/patients/update.rs - PUT /api/patients/:id handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::PatientChanges;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidJson, ValidPath};
use crate::services::PatientService;
use crate::AppState;

/// Partial update; omitted fields are untouched and `null` clears a field
pub async fn patient_put(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(changes): ValidJson<PatientChanges>,
) -> ApiResult<Value> {
    let patient = PatientService::new(&state, caller, scope).update(id, changes).await?;
    Ok(ApiResponse::success(json!({ "patient": patient })))
}
