// handlers/protected/organizations/update.rs - PUT /api/organizations/:id handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::OrganizationChanges;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidJson, ValidPath};
use crate::services::OrganizationService;
use crate::AppState;

/**
 * PUT /api/organizations/:id - Update organization details
 *
 * Allowed for the system owner, or for a member holding `organization.manage`.
 * Slug, id and audit fields are immutable and ignored if sent.
 * `subscription` may only be changed by the system owner:
 * ```json
 * { "subscription": { "plan": "professional", "expiresAt": "2027-01-01T00:00:00Z" } }
 * ```
 */
pub async fn organization_put(
    State(state): State<AppState>,
    caller: CurrentUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(changes): ValidJson<OrganizationChanges>,
) -> ApiResult<Value> {
    let organization = OrganizationService::new(&state, caller).update(id, changes).await?;
    Ok(ApiResponse::success(json!({ "organization": organization })))
}
