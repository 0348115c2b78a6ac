// handlers/protected/users/toggle_status.rs - PATCH /api/users/:id/toggle-status handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidPath};
use crate::services::UserService;
use crate::AppState;

pub async fn user_toggle_status_patch(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Value> {
    let user = UserService::new(&state, caller, scope).toggle_status(id).await?;
    let message = if user.is_active { "User activated" } else { "User deactivated" };
    Ok(ApiResponse::success(json!({ "user": user, "message": message })))
}
