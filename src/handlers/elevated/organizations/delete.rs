// handlers/elevated/organizations/delete.rs - DELETE /api/organizations/:id handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidPath};
use crate::services::OrganizationService;
use crate::AppState;

/// Only empty organizations can be deleted; otherwise 400 and use toggle-status
pub async fn organization_delete(
    State(state): State<AppState>,
    caller: CurrentUser,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Value> {
    OrganizationService::new(&state, caller).delete(id).await?;
    Ok(ApiResponse::success(json!({ "message": "Organization deleted successfully" })))
}
