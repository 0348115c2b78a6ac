// handlers/elevated/organizations/stats.rs - GET /api/organizations/stats handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::organization_service::SystemStats;
use crate::services::OrganizationService;
use crate::AppState;

pub async fn organizations_stats_get(State(state): State<AppState>, caller: CurrentUser) -> ApiResult<SystemStats> {
    let stats = OrganizationService::new(&state, caller).stats().await?;
    Ok(ApiResponse::success(stats))
}
