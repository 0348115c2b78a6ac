// handlers/protected/users/list.rs - GET /api/users handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidQuery};
use crate::services::user_service::{UserList, UserListQuery};
use crate::services::UserService;
use crate::AppState;

/// Query: `page`, `limit`, `search` (name or email), `role`, `active`
pub async fn users_get(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidQuery(query): ValidQuery<UserListQuery>,
) -> ApiResult<UserList> {
    let users = UserService::new(&state, caller, scope).list(query).await?;
    Ok(ApiResponse::success(users))
}
