// handlers/elevated/organizations/toggle_status.rs - PATCH /api/organizations/:id/toggle-status handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidPath};
use crate::services::OrganizationService;
use crate::AppState;

pub async fn organization_toggle_status_patch(
    State(state): State<AppState>,
    caller: CurrentUser,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Value> {
    let organization = OrganizationService::new(&state, caller).toggle_status(id).await?;
    let message = if organization.is_active { "Organization activated" } else { "Organization deactivated" };
    Ok(ApiResponse::success(json!({ "organization": organization, "message": message })))
}
