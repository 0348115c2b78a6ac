use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use super::auth::CurrentUser;
use crate::database::models::Organization;
use crate::database::TenantStore;
use crate::error::ApiError;
use crate::AppState;

/// The caller's organization plus a store handle restricted to it
#[derive(Clone)]
pub struct OrganizationScope {
    pub organization: Organization,
    pub store: TenantStore,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OrganizationScope {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OrganizationScope>()
            .cloned()
            .ok_or_else(|| ApiError::forbidden("Organization context required"))
    }
}

/// Requires the authenticated caller to belong to an active organization
/// whose subscription is active and not expired. Runs after `authenticate`.
pub async fn require_organization(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let organization_id = user.organization_id.ok_or_else(|| {
        tracing::warn!("User {} has no organization", user.id);
        ApiError::forbidden("User is not associated with an organization")
    })?;

    let organization = state
        .store
        .admin()
        .find_organization(organization_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("Organization not found"))?;

    check_organization(&organization).map_err(|e| {
        tracing::warn!("Organization {} rejected for user {}: {}", organization.id, user.id, e);
        e
    })?;

    let store = state.store.scoped(organization.id);
    request.extensions_mut().insert(OrganizationScope { organization, store });
    Ok(next.run(request).await)
}

fn check_organization(organization: &Organization) -> Result<(), ApiError> {
    if !organization.is_active {
        return Err(ApiError::forbidden("Organization is deactivated"));
    }
    if !organization.subscription.is_active {
        return Err(ApiError::forbidden("Organization subscription is inactive"));
    }
    if organization.subscription.is_expired(Utc::now()) {
        return Err(ApiError::forbidden("Organization subscription has expired"));
    }
    Ok(())
}
