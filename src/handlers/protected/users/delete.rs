// handlers/protected/users/delete.rs - DELETE /api/users/:id handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidPath};
use crate::services::UserService;
use crate::AppState;

pub async fn user_delete(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Value> {
    UserService::new(&state, caller, scope).delete(id).await?;
    Ok(ApiResponse::success(json!({ "message": "User deleted successfully" })))
}
