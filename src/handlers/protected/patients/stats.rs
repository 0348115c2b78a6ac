// handlers/protected/patients/stats.rs - GET /api/patients/stats handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope};
use crate::services::patient_service::PatientStats;
use crate::services::PatientService;
use crate::AppState;

pub async fn patients_stats_get(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
) -> ApiResult<PatientStats> {
    let stats = PatientService::new(&state, caller, scope).stats().await?;
    Ok(ApiResponse::success(stats))
}
