// handlers/elevated/organizations/create.rs - POST /api/organizations handler

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidJson};
use crate::services::organization_service::CreateOrganizationRequest;
use crate::services::OrganizationService;
use crate::AppState;

/// Organization plus its first owner (`ownerName`, `ownerEmail`, `ownerPassword`).
/// The slug is derived from the name; `plan` defaults to starter and `expiresAt` to the trial length.
pub async fn organizations_post(
    State(state): State<AppState>,
    caller: CurrentUser,
    ValidJson(request): ValidJson<CreateOrganizationRequest>,
) -> ApiResult<Value> {
    let created = OrganizationService::new(&state, caller).create(request).await?;
    Ok(ApiResponse::created(json!({ "organization": created.organization, "user": created.owner })))
}
