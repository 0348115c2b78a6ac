// handlers/protected/patients/search.rs - GET /api/patients/search handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidQuery};
use crate::services::patient_service::{PatientMatches, PatientSearchQuery};
use crate::services::PatientService;
use crate::AppState;

pub async fn patients_search_get(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidQuery(query): ValidQuery<PatientSearchQuery>,
) -> ApiResult<PatientMatches> {
    let matches = PatientService::new(&state, caller, scope).search(query).await?;
    Ok(ApiResponse::success(matches))
}
