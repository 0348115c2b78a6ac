use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth_service::{new_user, validate_credentials};
use super::{check_fields, ensure_capacity, resolve_pagination};
use crate::auth::hash_password_blocking;
use crate::config::PaginationConfig;
use crate::database::models::{Organization, PaginationMeta, User, UserChanges, UserFilter, UserProfile, UserQuery};
use crate::database::{AdminStore, TenantStore};
use crate::error::ApiError;
use crate::middleware::{CurrentUser, OrganizationScope};
use crate::permissions::{default_permissions_for, Permission, PermissionSet};
use crate::types::Role;
use crate::validation::{non_blank, normalize_email, validate_email_format, validate_password, FieldErrors};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub permissions: Option<PermissionSet>,
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub by_role: BTreeMap<&'static str, i64>,
}

/// User management inside the caller's organization
pub struct UserService {
    caller: CurrentUser,
    organization: Organization,
    store: TenantStore,
    admin: AdminStore,
    pagination: PaginationConfig,
}

impl UserService {
    pub fn new(state: &AppState, caller: CurrentUser, scope: OrganizationScope) -> Self {
        Self {
            caller,
            organization: scope.organization,
            store: scope.store,
            admin: state.store.admin(),
            pagination: state.config.pagination.clone(),
        }
    }

    pub async fn list(&self, query: UserListQuery) -> Result<UserList, ApiError> {
        let pagination = resolve_pagination(query.page, query.limit, &self.pagination);
        let filter = UserFilter {
            role: query.role,
            is_active: query.active,
            search: non_blank(query.search),
        };

        let page = self.store.list_users(&UserQuery { filter, pagination }).await?;
        Ok(UserList {
            users: page.items,
            pagination: pagination.meta(page.total),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<User, ApiError> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn create(&self, request: CreateUserRequest) -> Result<User, ApiError> {
        let credentials = validate_credentials(request.name, request.email, request.password);
        let ((name, email, password), role) = match (credentials, request.role) {
            (Ok(credentials), Some(role)) => (credentials, role),
            (Ok(_), None) => return Err(ApiError::invalid_field("role", "This field is required")),
            (Err(ApiError::ValidationError { message, field_errors }), None) => {
                let mut fields = field_errors.unwrap_or_default();
                fields.insert("role".to_string(), "This field is required".to_string());
                return Err(ApiError::validation_error(message, Some(fields)));
            }
            (Err(err), _) => return Err(err),
        };

        self.check_can_assign(role)?;
        if let Some(permissions) = &request.permissions {
            self.check_can_grant(permissions, &default_permissions_for(role))?;
        }

        let current = self.store.count_users(&UserFilter::default()).await?;
        ensure_capacity(current, self.organization.subscription.max_users, "users")?;

        if self.admin.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::duplicate("A user with this email already exists"));
        }

        let password_hash = hash_password_blocking(password).await?;
        let mut user = new_user(name, email, password_hash, role, Some(self.organization.id));
        if let Some(permissions) = request.permissions {
            user.permissions = permissions;
        }
        user.profile = request.profile.unwrap_or_default();

        self.store.insert_user(&user).await?;
        tracing::info!("User {} ({}) created in organization {} by {}", user.id, user.role, self.organization.id, self.caller.id);
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<User, ApiError> {
        let mut user = self.get(id).await?;
        self.check_can_manage(&user)?;

        let is_self = user.id == self.caller.id;
        if let Some(role) = changes.role {
            if role != user.role {
                if is_self {
                    return Err(ApiError::bad_request("You cannot change your own role"));
                }
                self.check_can_assign(role)?;
            }
        }
        if is_self && changes.is_active == Some(false) {
            return Err(ApiError::bad_request("You cannot deactivate your own account"));
        }
        if let Some(permissions) = &changes.permissions {
            if is_self && *permissions != user.permissions {
                return Err(ApiError::bad_request("You cannot change your own permissions"));
            }
            let mut baseline = user.permissions.clone();
            baseline.extend(default_permissions_for(changes.role.unwrap_or(user.role)));
            self.check_can_grant(permissions, &baseline)?;
        }

        let mut errors = FieldErrors::new();
        if let Some(name) = changes.name {
            match non_blank(Some(name)) {
                Some(name) => user.name = name,
                None => errors.add("name", "Name cannot be empty"),
            }
        }

        let mut email_changed = false;
        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            match validate_email_format(&email) {
                Ok(()) if email != user.email => {
                    user.email = email;
                    email_changed = true;
                }
                Ok(()) => {}
                Err(msg) => errors.add("email", msg),
            }
        }
        if let Some(Err(msg)) = changes.password.as_deref().map(validate_password) {
            errors.add("password", msg);
        }
        check_fields(errors)?;

        if email_changed && self.admin.find_user_by_email(&user.email).await?.is_some() {
            return Err(ApiError::duplicate("A user with this email already exists"));
        }

        if let Some(role) = changes.role {
            if role != user.role {
                user.role = role;
                if changes.permissions.is_none() {
                    user.permissions = default_permissions_for(role);
                }
            }
        }
        if let Some(permissions) = changes.permissions {
            user.permissions = permissions;
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = is_active;
        }
        if let Some(profile) = changes.profile {
            user.profile = profile;
        }
        if let Some(password) = changes.password {
            user.password_hash = hash_password_blocking(password).await?;
        }
        user.updated_at = Utc::now();

        self.store.update_user(&user).await?;
        tracing::info!("User {} updated by {}", user.id, self.caller.id);
        Ok(user)
    }

    pub async fn toggle_status(&self, id: Uuid) -> Result<User, ApiError> {
        if id == self.caller.id {
            return Err(ApiError::bad_request("You cannot deactivate your own account"));
        }
        let target = self.get(id).await?;
        self.check_can_manage(&target)?;

        let user = self
            .store
            .toggle_user_status(id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        tracing::info!(
            "User {} {} by {}",
            user.id,
            if user.is_active { "activated" } else { "deactivated" },
            self.caller.id
        );
        Ok(user)
    }

    /// Hard delete of another account in the same organization
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        if id == self.caller.id {
            return Err(ApiError::bad_request("You cannot delete your own account"));
        }
        let target = self.get(id).await?;
        self.check_can_manage(&target)?;

        if !self.store.delete_user(id).await? {
            return Err(ApiError::not_found("User not found"));
        }
        tracing::info!("User {} deleted from organization {} by {}", id, self.organization.id, self.caller.id);
        Ok(())
    }

    pub async fn stats(&self) -> Result<UserStats, ApiError> {
        let active = UserFilter { is_active: Some(true), ..Default::default() };
        let all = UserFilter::default();
        let (total, active) = futures::try_join!(
            self.store.count_users(&all),
            self.store.count_users(&active),
        )?;

        let mut by_role = BTreeMap::new();
        for role in Role::ALL {
            let filter = UserFilter { role: Some(role), ..Default::default() };
            by_role.insert(role.as_str(), self.store.count_users(&filter).await?);
        }

        Ok(UserStats { total, active, inactive: total - active, by_role })
    }

    /// Only owners may hand out the owner role
    fn check_can_assign(&self, role: Role) -> Result<(), ApiError> {
        if role == Role::Owner && self.caller.role != Role::Owner {
            return Err(ApiError::forbidden("Only owners can assign the owner role"));
        }
        Ok(())
    }

    /// Nobody holds `patients.delete`, and anything past `baseline` must
    /// already belong to the caller
    fn check_can_grant(&self, requested: &PermissionSet, baseline: &PermissionSet) -> Result<(), ApiError> {
        if requested.contains(&Permission::PatientsDelete) {
            return Err(ApiError::invalid_field("permissions", "patients.delete cannot be granted"));
        }
        let withheld: Vec<&str> = requested
            .difference(baseline)
            .filter(|p| !self.caller.has_permission(**p))
            .map(|p| p.as_str())
            .collect();
        if !withheld.is_empty() {
            return Err(ApiError::forbidden(format!(
                "You cannot grant permissions you do not hold: {}",
                withheld.join(", ")
            )));
        }
        Ok(())
    }

    /// Only owners may modify owner accounts
    fn check_can_manage(&self, target: &User) -> Result<(), ApiError> {
        if target.role == Role::Owner && self.caller.role != Role::Owner {
            return Err(ApiError::forbidden("Only owners can modify owner accounts"));
        }
        Ok(())
    }
}
