// handlers/protected/patients/list.rs - GET /api/patients handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidQuery};
use crate::services::patient_service::{PatientList, PatientListQuery};
use crate::services::PatientService;
use crate::AppState;

/// Query: `page`, `limit`, `search` (name, email, document or phone),
/// `gender`, `active`. Newest first.
pub async fn patients_get(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidQuery(query): ValidQuery<PatientListQuery>,
) -> ApiResult<PatientList> {
    let patients = PatientService::new(&state, caller, scope).list(query).await?;
    Ok(ApiResponse::success(patients))
}
