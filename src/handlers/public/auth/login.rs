// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, ValidJson};
use crate::services::auth_service::{AuthResponse, LoginRequest};
use crate::services::AuthService;
use crate::AppState;

/**
 * POST /api/auth/login - Authenticate and receive a session token
 *
 * Expected Input:
 * ```json
 * { "email": "ana@clinic.com", "password": "secret123" }
 * ```
 *
 * Output: `{ "success": true, "id", "name", "email", "role", "organizationId", "token" }`
 *
 * Failures are distinguishable: 404 unknown email, 403 deactivated account,
 * 401 wrong password.
 */
pub async fn login_post(State(state): State<AppState>, ValidJson(request): ValidJson<LoginRequest>) -> ApiResult<AuthResponse> {
    let response = AuthService::new(&state).login(request).await?;
    Ok(ApiResponse::success(response))
}
