// handlers/protected/organizations/my_stats.rs - GET /api/organizations/my/stats handler

use crate::middleware::{ApiResponse, ApiResult, OrganizationScope};
use crate::services::organization_service::{organization_stats, OrganizationStats};

/// Usage against plan limits plus subscription status
pub async fn my_stats_get(scope: OrganizationScope) -> ApiResult<OrganizationStats> {
    let stats = organization_stats(&scope.organization, &scope.store).await?;
    Ok(ApiResponse::success(stats))
}
