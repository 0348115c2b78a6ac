// handlers/protected/users/show.rs - GET /api/users/:id handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidPath};
use crate::services::UserService;
use crate::AppState;

pub async fn user_get(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Value> {
    let user = UserService::new(&state, caller, scope).get(id).await?;
    Ok(ApiResponse::success(json!({ "user": user })))
}
