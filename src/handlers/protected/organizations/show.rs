// handlers/protected/organizations/show.rs - GET /api/organizations/:id handler

use axum::extract::State;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidPath};
use crate::services::OrganizationService;
use crate::AppState;

pub async fn organization_get(
    State(state): State<AppState>,
    caller: CurrentUser,
    ValidPath(id): ValidPath<Uuid>,
) -> ApiResult<Value> {
    let organization = OrganizationService::new(&state, caller).get(id).await?;
    Ok(ApiResponse::success(json!({ "organization": organization })))
}
