// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, ValidJson};
use crate::services::auth_service::{AuthResponse, RegisterRequest};
use crate::services::AuthService;
use crate::AppState;

/// Self-service account without an organization
pub async fn register_post(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let response = AuthService::new(&state).register(request).await?;
    Ok(ApiResponse::created(response))
}
