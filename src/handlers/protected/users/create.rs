// handlers/protected/users/create.rs - POST /api/users handler

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidJson};
use crate::services::user_service::CreateUserRequest;
use crate::services::UserService;
use crate::AppState;

/**
 * POST /api/users - Add a user to the caller's organization
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "Dr. Paulo",
 *   "email": "paulo@clinic.com",
 *   "password": "secret123",
 *   "role": "dentist",
 *   "profile": { "licenseNumber": "CRO-12345", "specialty": "orthodontics" }
 * }
 * ```
 *
 * Permissions default to the role's table unless `permissions` is given.
 * Email is unique across all organizations. Fails with 403 once the plan's
 * user limit is reached, or when a non-owner tries to create an owner.
 */
pub async fn users_post(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidJson(request): ValidJson<CreateUserRequest>,
) -> ApiResult<Value> {
    let user = UserService::new(&state, caller, scope).create(request).await?;
    Ok(ApiResponse::created(json!({ "user": user })))
}
