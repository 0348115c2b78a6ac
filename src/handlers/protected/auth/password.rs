// handlers/protected/auth/password.rs - PUT /api/auth/password handler

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidJson};
use crate::services::auth_service::ChangePasswordRequest;
use crate::services::AuthService;
use crate::AppState;

pub async fn password_put(
    State(state): State<AppState>,
    caller: CurrentUser,
    ValidJson(request): ValidJson<ChangePasswordRequest>,
) -> ApiResult<Value> {
    AuthService::new(&state).change_password(&caller, request).await?;
    Ok(ApiResponse::success(json!({ "message": "Password updated successfully" })))
}
