use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::CurrentUser;
use crate::error::ApiError;
use crate::permissions::Permission;
use crate::types::Role;

/// Operational roles that may manage patients without holding the permission tag
pub const CLINIC_MANAGERS: &[Role] = &[Role::Owner, Role::Admin];

/// Per-route authorization rule, applied with
/// `handler.layer(from_fn_with_state(gate, authorize))`
#[derive(Debug, Clone, Copy)]
pub enum Gate {
    Roles(&'static [Role]),
    Permission(Permission),
    /// Either a listed role or the permission tag
    RoleOrPermission(&'static [Role], Permission),
    /// Owner account that belongs to no organization
    System,
}

impl Gate {
    pub fn allows(&self, user: &CurrentUser) -> bool {
        match self {
            Gate::Roles(roles) => user.has_role(roles),
            Gate::Permission(permission) => user.has_permission(*permission),
            Gate::RoleOrPermission(roles, permission) => user.has_role(roles) || user.has_permission(*permission),
            Gate::System => user.is_system(),
        }
    }

    fn denial(&self) -> &'static str {
        match self {
            Gate::Roles(_) => "Insufficient role for this operation",
            Gate::Permission(_) | Gate::RoleOrPermission(..) => "Insufficient permissions for this operation",
            Gate::System => "Only system administrators can perform this operation",
        }
    }
}

pub async fn authorize(State(gate): State<Gate>, request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !gate.allows(user) {
        tracing::warn!(
            "User {} ({}) denied {} {}: {:?}",
            user.id,
            user.role,
            request.method(),
            request.uri().path(),
            gate
        );
        return Err(ApiError::forbidden(gate.denial()));
    }

    Ok(next.run(request).await)
}
