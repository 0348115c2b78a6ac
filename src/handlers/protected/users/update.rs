// handlers/protected/users/update.rs - PUT /api/users/:id handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::UserChanges;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidJson, ValidPath};
use crate::services::UserService;
use crate::AppState;

/// Identity and audit fields in the body are ignored. Callers cannot change
/// their own role or deactivate themselves.
pub async fn user_put(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(changes): ValidJson<UserChanges>,
) -> ApiResult<Value> {
    let user = UserService::new(&state, caller, scope).update(id, changes).await?;
    Ok(ApiResponse::success(json!({ "user": user })))
}
