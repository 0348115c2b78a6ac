// handlers/elevated/organizations/list.rs - GET /api/organizations handler

use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, ValidQuery};
use crate::services::organization_service::{OrganizationList, OrganizationListQuery};
use crate::services::OrganizationService;
use crate::AppState;

/// Query: `page`, `limit`, `search` (name, email or slug), `plan`, `active`
pub async fn organizations_get(
    State(state): State<AppState>,
    caller: CurrentUser,
    ValidQuery(query): ValidQuery<OrganizationListQuery>,
) -> ApiResult<OrganizationList> {
    let organizations = OrganizationService::new(&state, caller).list(query).await?;
    Ok(ApiResponse::success(organizations))
}
