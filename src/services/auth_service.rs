use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::check_fields;
use super::organization_service::{new_organization, unique_slug};
use crate::auth::{hash_password_blocking, verify_password_blocking, TokenService};
use crate::database::models::{Address, Organization, ProfileChanges, Subscription, User, UserProfile};
use crate::database::Store;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::permissions::default_permissions_for;
use crate::types::{PlanTier, Role};
use crate::validation::{
    non_blank, normalize_document, normalize_email, validate_email_format, validate_password, FieldErrors,
};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOrganizationRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub profile: Option<UserProfile>,
    pub organization_name: Option<String>,
    /// Defaults to the owner's email
    pub organization_email: Option<String>,
    pub organization_document: Option<String>,
    pub organization_phone: Option<String>,
    pub organization_address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Identity plus a fresh session token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct OrganizationRegistration {
    pub user: User,
    pub organization: Organization,
    pub token: String,
}

pub struct AuthService {
    store: Store,
    tokens: Arc<TokenService>,
    trial_days: i64,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            tokens: state.tokens.clone(),
            trial_days: state.config.security.trial_days,
        }
    }

    /// Self-service signup. The account starts outside any organization, so
    /// only the admin role is available here.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        let (name, email, password) = validate_credentials(request.name, request.email, request.password)?;

        let role = request.role.unwrap_or(Role::Admin);
        if role != Role::Admin {
            return Err(ApiError::invalid_field(
                "role",
                "Self-registration creates admin accounts; other roles are added by an organization administrator",
            ));
        }

        let admin = self.store.admin();
        if admin.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::duplicate("A user with this email already exists"));
        }

        let password_hash = hash_password_blocking(password).await?;
        let user = new_user(name, email, password_hash, role, None);
        admin.insert_user(&user).await?;

        tracing::info!("User {} registered with role {}", user.id, user.role);
        self.auth_response(user)
    }

    /// Create an organization and its owner in one step, returning a token for the owner
    pub async fn register_organization(
        &self,
        request: RegisterOrganizationRequest,
    ) -> Result<OrganizationRegistration, ApiError> {
        let organization_email = request
            .organization_email
            .as_deref()
            .or(request.email.as_deref())
            .map(normalize_email)
            .unwrap_or_default();

        let mut errors = FieldErrors::new();
        errors.require("organizationName", request.organization_name.as_deref());
        if !organization_email.is_empty() {
            if let Err(msg) = validate_email_format(&organization_email) {
                errors.add("organizationEmail", msg);
            }
        }
        let credentials = validate_credentials(request.name, request.email, request.password);
        if let Err(ApiError::ValidationError { field_errors: Some(fields), .. }) = &credentials {
            for (field, message) in fields {
                errors.add(field, message.clone());
            }
        }
        check_fields(errors)?;
        let (name, email, password) = credentials?;

        let admin = self.store.admin();
        if admin.find_organization_by_email(&organization_email).await?.is_some() {
            return Err(ApiError::duplicate("An organization with this email already exists"));
        }
        if admin.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::duplicate("A user with this email already exists"));
        }

        let organization_name = request.organization_name.unwrap_or_default().trim().to_string();
        let slug = unique_slug(&admin, &organization_name).await?;
        let trial = Subscription::for_plan(PlanTier::Starter, Some(Utc::now() + Duration::days(self.trial_days)));

        let mut organization = new_organization(organization_name, slug, organization_email, trial);
        organization.document = request.organization_document.as_deref().and_then(normalize_document);
        organization.phone = non_blank(request.organization_phone);
        organization.address = request.organization_address.unwrap_or_default();

        let password_hash = hash_password_blocking(password).await?;
        let mut owner = new_user(name, email, password_hash, Role::Owner, Some(organization.id));
        owner.profile = request.profile.unwrap_or_default();
        organization.created_by = Some(owner.id);

        admin.insert_organization_with_owner(&organization, &owner).await?;
        tracing::info!(
            "Organization {} ({}) registered with owner {}",
            organization.id,
            organization.slug,
            owner.id
        );

        let token = self.tokens.issue(owner.id)?;
        Ok(OrganizationRegistration { user: owner, organization, token })
    }

    /// Unknown email, deactivated account and wrong password are reported distinctly
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ApiError> {
        let mut errors = FieldErrors::new();
        errors.require("email", request.email.as_deref());
        errors.require("password", request.password.as_deref());
        check_fields(errors)?;

        let email = normalize_email(request.email.as_deref().unwrap_or_default());
        let password = request.password.unwrap_or_default();

        let admin = self.store.admin();
        let user = admin.find_user_by_email(&email).await?.ok_or_else(|| {
            tracing::warn!("Login attempt for unknown email");
            ApiError::not_found("User not found")
        })?;

        if !user.is_active {
            tracing::warn!("Login attempt for deactivated user {}", user.id);
            return Err(ApiError::forbidden("User account is deactivated"));
        }

        if !verify_password_blocking(password, user.password_hash.clone()).await {
            tracing::warn!("Wrong password for user {}", user.id);
            return Err(ApiError::unauthorized("Invalid password"));
        }

        let now = Utc::now();
        admin.record_login(user.id, now).await?;
        let mut user = user;
        user.last_login = Some(now);

        tracing::info!("User {} logged in", user.id);
        self.auth_response(user)
    }

    pub async fn profile(&self, caller: &CurrentUser) -> Result<User, ApiError> {
        self.store
            .admin()
            .find_user(caller.id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    pub async fn update_profile(&self, caller: &CurrentUser, changes: ProfileChanges) -> Result<User, ApiError> {
        let mut user = self.profile(caller).await?;

        if let Some(name) = changes.name {
            user.name = non_blank(Some(name)).ok_or_else(|| ApiError::invalid_field("name", "Name cannot be empty"))?;
        }
        if let Some(profile) = changes.profile {
            user.profile = profile;
        }
        user.updated_at = Utc::now();

        self.store.admin().update_user(&user).await?;
        tracing::info!("User {} updated their profile", user.id);
        Ok(user)
    }

    pub async fn change_password(&self, caller: &CurrentUser, request: ChangePasswordRequest) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        errors.require("currentPassword", request.current_password.as_deref());
        errors.require("newPassword", request.new_password.as_deref());
        if let Some(Err(msg)) = request.new_password.as_deref().map(validate_password) {
            errors.add("newPassword", msg);
        }
        check_fields(errors)?;

        let mut user = self.profile(caller).await?;
        let current = request.current_password.unwrap_or_default();
        if !verify_password_blocking(current, user.password_hash.clone()).await {
            tracing::warn!("Password change for user {} with wrong current password", user.id);
            return Err(ApiError::invalid_field("currentPassword", "Current password is incorrect"));
        }

        user.password_hash = hash_password_blocking(request.new_password.unwrap_or_default()).await?;
        user.updated_at = Utc::now();
        self.store.admin().update_user(&user).await?;

        tracing::info!("User {} changed their password", user.id);
        Ok(())
    }

    fn auth_response(&self, user: User) -> Result<AuthResponse, ApiError> {
        let token = self.tokens.issue(user.id)?;
        Ok(AuthResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            organization_id: user.organization_id,
            token,
        })
    }
}

/// Required name, well-formed email and a long enough password.
/// Returns them trimmed, with the email case-folded.
pub(crate) fn validate_credentials(
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<(String, String, String), ApiError> {
    let mut errors = FieldErrors::new();
    errors.require("name", name.as_deref());
    errors.require("email", email.as_deref());
    errors.require("password", password.as_deref());

    let email = email.as_deref().map(normalize_email).unwrap_or_default();
    if !email.is_empty() {
        if let Err(msg) = validate_email_format(&email) {
            errors.add("email", msg);
        }
    }
    if let Some(Err(msg)) = password.as_deref().map(validate_password) {
        errors.add("password", msg);
    }
    check_fields(errors)?;

    Ok((
        name.unwrap_or_default().trim().to_string(),
        email,
        password.unwrap_or_default(),
    ))
}

/// System-level owner with no organization, created by the operator CLI
pub async fn bootstrap_owner(store: &Store, name: String, email: String, password: String) -> Result<User, ApiError> {
    let (name, email, password) = validate_credentials(Some(name), Some(email), Some(password))?;
    let admin = store.admin();
    if admin.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::duplicate("A user with this email already exists"));
    }

    let password_hash = hash_password_blocking(password).await?;
    let owner = new_user(name, email, password_hash, Role::Owner, None);
    admin.insert_user(&owner).await?;
    tracing::info!("System owner {} ({}) bootstrapped", owner.id, owner.email);
    Ok(owner)
}

/// Active user with the role's default permissions
pub(crate) fn new_user(
    name: String,
    email: String,
    password_hash: String,
    role: Role,
    organization_id: Option<Uuid>,
) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        name,
        email,
        password_hash,
        role,
        organization_id,
        permissions: default_permissions_for(role),
        is_active: true,
        last_login: None,
        profile: UserProfile::default(),
        created_at: now,
        updated_at: now,
    }
}
