// handlers/public/auth/register_organization.rs - POST /api/auth/register-organization handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, ValidJson};
use crate::services::auth_service::{OrganizationRegistration, RegisterOrganizationRequest};
use crate::services::AuthService;
use crate::AppState;

/**
 * POST /api/auth/register-organization - Sign up a clinic and its owner
 *
 * Expected Input:
 * ```json
 * {
 *   "name": "Ana Souza",
 *   "email": "ana@acme.com",
 *   "password": "secret123",
 *   "organizationName": "Acme Dental",
 *   "organizationEmail": "contact@acme.com"   // optional, defaults to email
 * }
 * ```
 *
 * Output (201): `{ "success": true, "user": {...}, "organization": {...}, "token": "..." }`
 *
 * The organization starts on a starter trial. Organization and owner are
 * stored together or not at all.
 */
pub async fn register_organization_post(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RegisterOrganizationRequest>,
) -> ApiResult<OrganizationRegistration> {
    let registration = AuthService::new(&state).register_organization(request).await?;
    Ok(ApiResponse::created(registration))
}
