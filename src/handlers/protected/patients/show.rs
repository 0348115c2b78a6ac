// handlers/protected/patients/show.rs - GET /api/patients/:id handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidPath};
use crate::services::PatientService;
use crate::AppState;

/// Patient plus `createdByName`. Patients of other organizations are 404.
pub async fn patient_get(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Value> {
    let patient = PatientService::new(&state, caller, scope).get(id).await?;
    Ok(ApiResponse::success(json!({ "patient": patient })))
}
