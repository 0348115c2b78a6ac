// handlers/protected/organizations/my.rs - GET /api/organizations/my handler

use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, OrganizationScope};

/// The organization already loaded and checked by the scope middleware
pub async fn my_get(scope: OrganizationScope) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({ "organization": scope.organization })))
}
