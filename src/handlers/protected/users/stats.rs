// handlers/protected/users/stats.rs - GET /api/users/stats handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope};
use crate::services::user_service::UserStats;
use crate::services::UserService;
use crate::AppState;

pub async fn users_stats_get(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
) -> ApiResult<UserStats> {
    let stats = UserService::new(&state, caller, scope).stats().await?;
    Ok(ApiResponse::success(stats))
}
