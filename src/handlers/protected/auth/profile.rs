// handlers/protected/auth/profile.rs - GET|PUT /api/auth/profile handlers

use axum::extract::State;

use crate::database::models::{ProfileChanges, User};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidJson};
use crate::services::AuthService;
use crate::AppState;

/// The caller's own account, password hash excluded
pub async fn profile_get(State(state): State<AppState>, caller: CurrentUser) -> ApiResult<User> {
    let user = AuthService::new(&state).profile(&caller).await?;
    Ok(ApiResponse::success(user))
}

/// Name and profile only; role, email and status are managed by administrators
pub async fn profile_put(
    State(state): State<AppState>,
    caller: CurrentUser,
    ValidJson(changes): ValidJson<ProfileChanges>,
) -> ApiResult<User> {
    let user = AuthService::new(&state).update_profile(&caller, changes).await?;
    Ok(ApiResponse::success(user))
}
