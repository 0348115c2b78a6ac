use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::auth_service::{new_user, validate_credentials};
use super::{check_fields, resolve_pagination};
use crate::auth::hash_password_blocking;
use crate::config::PaginationConfig;
use crate::database::models::{
    Address, Organization, OrganizationChanges, OrganizationFilter, OrganizationQuery, PaginationMeta,
    PatientFilter, Subscription, User, UserFilter,
};
use crate::database::{AdminStore, TenantStore};
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::permissions::Permission;
use crate::types::{PlanTier, Role};
use crate::validation::{non_blank, normalize_document, normalize_email, slug_candidate, slugify, validate_email_format, FieldErrors};
use crate::AppState;

const MAX_SLUG_ATTEMPTS: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct OrganizationListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub plan: Option<PlanTier>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub settings: Option<Value>,
    pub plan: Option<PlanTier>,
    pub expires_at: Option<DateTime<Utc>>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub owner_password: Option<String>,
}

/// A system-created organization and the owner it was created with
#[derive(Debug, Serialize)]
pub struct CreatedOrganization {
    pub organization: Organization,
    pub owner: User,
}

#[derive(Debug, Serialize)]
pub struct OrganizationList {
    pub organizations: Vec<Organization>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCount {
    pub total: i64,
    pub active: i64,
    pub limit: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub plan: PlanTier,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
    pub features: Vec<String>,
}

/// Dashboard numbers for the caller's own organization
#[derive(Debug, Serialize)]
pub struct OrganizationStats {
    pub users: UsageCount,
    pub patients: UsageCount,
    pub subscription: SubscriptionStatus,
}

/// System-wide numbers for operators
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub by_plan: BTreeMap<&'static str, i64>,
    pub users: i64,
    pub patients: i64,
}

pub struct OrganizationService {
    admin: AdminStore,
    caller: CurrentUser,
    pagination: PaginationConfig,
    trial_days: i64,
}

impl OrganizationService {
    pub fn new(state: &AppState, caller: CurrentUser) -> Self {
        Self {
            admin: state.store.admin(),
            caller,
            pagination: state.config.pagination.clone(),
            trial_days: state.config.security.trial_days,
        }
    }

    pub async fn list(&self, query: OrganizationListQuery) -> Result<OrganizationList, ApiError> {
        let pagination = resolve_pagination(query.page, query.limit, &self.pagination);
        let filter = OrganizationFilter {
            is_active: query.active,
            plan: query.plan,
            search: non_blank(query.search),
        };

        let page = self.admin.list_organizations(&OrganizationQuery { filter, pagination }).await?;
        Ok(OrganizationList {
            organizations: page.items,
            pagination: pagination.meta(page.total),
        })
    }

    /// New organization together with its first owner, so it is never created empty
    pub async fn create(&self, request: CreateOrganizationRequest) -> Result<CreatedOrganization, ApiError> {
        let mut errors = FieldErrors::new();
        errors.require("name", request.name.as_deref());
        errors.require("email", request.email.as_deref());
        let email = request.email.as_deref().map(normalize_email).unwrap_or_default();
        if !email.is_empty() {
            if let Err(msg) = validate_email_format(&email) {
                errors.add("email", msg);
            }
        }
        let credentials = validate_credentials(request.owner_name, request.owner_email, request.owner_password);
        if let Err(ApiError::ValidationError { field_errors: Some(fields), .. }) = &credentials {
            for (field, message) in fields {
                errors.add(&owner_field(field), message.clone());
            }
        }
        check_fields(errors)?;
        let (owner_name, owner_email, owner_password) = credentials?;

        if self.admin.find_organization_by_email(&email).await?.is_some() {
            return Err(ApiError::duplicate("An organization with this email already exists"));
        }
        if self.admin.find_user_by_email(&owner_email).await?.is_some() {
            return Err(ApiError::duplicate("A user with this email already exists"));
        }

        let name = request.name.unwrap_or_default().trim().to_string();
        let slug = unique_slug(&self.admin, &name).await?;
        let plan = request.plan.unwrap_or(PlanTier::Starter);
        let expires_at = request
            .expires_at
            .or_else(|| Some(Utc::now() + Duration::days(self.trial_days)));

        let mut organization = new_organization(name, slug, email, Subscription::for_plan(plan, expires_at));
        organization.document = request.document.as_deref().and_then(normalize_document);
        organization.phone = non_blank(request.phone);
        organization.address = request.address.unwrap_or_default();
        if let Some(settings) = request.settings {
            organization.settings = settings;
        }
        organization.created_by = Some(self.caller.id);

        let password_hash = hash_password_blocking(owner_password).await?;
        let owner = new_user(owner_name, owner_email, password_hash, Role::Owner, Some(organization.id));

        self.admin.insert_organization_with_owner(&organization, &owner).await?;
        tracing::info!(
            "Organization {} ({}) created with owner {} by {}",
            organization.id,
            organization.slug,
            owner.id,
            self.caller.id
        );
        Ok(CreatedOrganization { organization, owner })
    }

    /// Other tenants' organizations look the same as missing ones
    pub async fn get(&self, id: Uuid) -> Result<Organization, ApiError> {
        if !self.caller.is_system() && !self.caller.belongs_to(id) {
            return Err(ApiError::not_found("Organization not found"));
        }
        self.find(id).await
    }

    pub async fn update(&self, id: Uuid, changes: OrganizationChanges) -> Result<Organization, ApiError> {
        let is_system = self.caller.is_system();
        if !is_system && !(self.caller.belongs_to(id) && self.caller.has_permission(Permission::OrganizationManage)) {
            return Err(ApiError::forbidden("Insufficient permissions to update this organization"));
        }
        if changes.subscription.is_some() && !is_system {
            return Err(ApiError::forbidden("Only system administrators can change subscriptions"));
        }

        let mut organization = self.find(id).await?;
        let mut errors = FieldErrors::new();

        if let Some(name) = changes.name {
            match non_blank(Some(name)) {
                Some(name) => organization.name = name,
                None => errors.add("name", "Name cannot be empty"),
            }
        }

        let mut email_changed = false;
        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            match validate_email_format(&email) {
                Ok(()) if email != organization.email => {
                    organization.email = email;
                    email_changed = true;
                }
                Ok(()) => {}
                Err(msg) => errors.add("email", msg),
            }
        }
        check_fields(errors)?;

        if email_changed {
            if let Some(other) = self.admin.find_organization_by_email(&organization.email).await? {
                if other.id != organization.id {
                    return Err(ApiError::duplicate("An organization with this email already exists"));
                }
            }
        }

        if let Some(document) = changes.document {
            organization.document = document.as_deref().and_then(normalize_document);
        }
        if let Some(phone) = changes.phone {
            organization.phone = non_blank(phone);
        }
        if let Some(address) = changes.address {
            organization.address = address;
        }
        if let Some(settings) = changes.settings {
            organization.settings = settings;
        }
        if let Some(subscription) = changes.subscription {
            subscription.apply(&mut organization.subscription);
        }
        organization.updated_at = Utc::now();

        self.admin.update_organization(&organization).await?;
        tracing::info!("Organization {} updated by {}", organization.id, self.caller.id);
        Ok(organization)
    }

    /// Hard delete, allowed only once nothing references the organization
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let organization = self.find(id).await?;

        let all_users = UserFilter::default();
        let all_patients = PatientFilter::default();
        let (users, patients) = futures::try_join!(
            self.admin.count_users(Some(id), &all_users),
            self.admin.count_patients(Some(id), &all_patients),
        )?;
        if users > 0 || patients > 0 {
            return Err(ApiError::bad_request(format!(
                "Organization still has {} users and {} patients; deactivate it instead",
                users, patients
            )));
        }

        if !self.admin.delete_organization(id).await? {
            return Err(ApiError::not_found("Organization not found"));
        }
        tracing::info!("Organization {} ({}) deleted by {}", id, organization.slug, self.caller.id);
        Ok(())
    }

    pub async fn toggle_status(&self, id: Uuid) -> Result<Organization, ApiError> {
        let organization = self
            .admin
            .toggle_organization_status(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))?;
        tracing::info!(
            "Organization {} {} by {}",
            organization.id,
            if organization.is_active { "activated" } else { "deactivated" },
            self.caller.id
        );
        Ok(organization)
    }

    pub async fn stats(&self) -> Result<SystemStats, ApiError> {
        let active = OrganizationFilter { is_active: Some(true), ..Default::default() };
        let all_organizations = OrganizationFilter::default();
        let all_users = UserFilter::default();
        let all_patients = PatientFilter::default();
        let (total, active, users, patients) = futures::try_join!(
            self.admin.count_organizations(&all_organizations),
            self.admin.count_organizations(&active),
            self.admin.count_users(None, &all_users),
            self.admin.count_patients(None, &all_patients),
        )?;

        let mut by_plan = BTreeMap::new();
        for plan in PlanTier::ALL {
            let filter = OrganizationFilter { plan: Some(plan), ..Default::default() };
            by_plan.insert(plan.as_str(), self.admin.count_organizations(&filter).await?);
        }

        Ok(SystemStats {
            total,
            active,
            inactive: total - active,
            by_plan,
            users,
            patients,
        })
    }

    async fn find(&self, id: Uuid) -> Result<Organization, ApiError> {
        self.admin
            .find_organization(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))
    }
}

/// Usage of `organization` against its plan, counted through its own tenant handle
pub async fn organization_stats(organization: &Organization, store: &TenantStore) -> Result<OrganizationStats, ApiError> {
    let active_users = UserFilter { is_active: Some(true), ..Default::default() };
    let active_patients = PatientFilter { is_active: Some(true), ..Default::default() };

    let all_users = UserFilter::default();
    let all_patients = PatientFilter::default();
    let (users, users_active, patients, patients_active) = futures::try_join!(
        store.count_users(&all_users),
        store.count_users(&active_users),
        store.count_patients(&all_patients),
        store.count_patients(&active_patients),
    )?;

    let subscription = &organization.subscription;
    Ok(OrganizationStats {
        users: UsageCount { total: users, active: users_active, limit: subscription.max_users },
        patients: UsageCount { total: patients, active: patients_active, limit: subscription.max_patients },
        subscription: SubscriptionStatus {
            plan: subscription.plan,
            is_active: subscription.is_active,
            expires_at: subscription.expires_at,
            days_remaining: subscription.days_remaining(Utc::now()),
            features: subscription.features.clone(),
        },
    })
}

/// First free slug derived from `name`: `acme`, `acme-1`, `acme-2`, ...
pub(crate) async fn unique_slug(admin: &AdminStore, name: &str) -> Result<String, ApiError> {
    let base = slugify(name);
    for attempt in 0..MAX_SLUG_ATTEMPTS {
        let candidate = slug_candidate(&base, attempt);
        if admin.find_organization_by_slug(&candidate).await?.is_none() {
            return Ok(candidate);
        }
    }

    let suffix = Uuid::new_v4().simple().to_string();
    Ok(format!("{}-{}", base, &suffix[..8]))
}

/// Fresh active organization with empty optional fields
pub(crate) fn new_organization(name: String, slug: String, email: String, subscription: Subscription) -> Organization {
    let now = Utc::now();
    Organization {
        id: Uuid::new_v4(),
        name,
        slug,
        document: None,
        email,
        phone: None,
        address: Address::default(),
        subscription,
        settings: Value::Object(Default::default()),
        is_active: true,
        created_by: None,
        created_at: now,
        updated_at: now,
    }
}

fn owner_field(field: &str) -> String {
    match field {
        "name" => "ownerName".to_string(),
        "email" => "ownerEmail".to_string(),
        "password" => "ownerPassword".to_string(),
        other => other.to_string(),
    }
}

/// Organizations with no users created before `created_before`
pub async fn find_orphans(admin: &AdminStore, created_before: DateTime<Utc>) -> Result<Vec<Organization>, ApiError> {
    Ok(admin.list_orphan_organizations(created_before).await?)
}

/// Delete every orphan older than `created_before`, returning the removed rows
pub async fn purge_orphans(admin: &AdminStore, created_before: DateTime<Utc>) -> Result<Vec<Organization>, ApiError> {
    let mut removed = Vec::new();
    for org in find_orphans(admin, created_before).await? {
        if admin.delete_organization(org.id).await? {
            tracing::warn!("Removed orphaned organization {} ({}) created at {}", org.id, org.slug, org.created_at);
            removed.push(org);
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::{MemoryStore, Store};
    use std::sync::Arc;

    async fn seed(admin: &AdminStore, name: &str, email: &str) -> (Organization, User) {
        let slug = unique_slug(admin, name).await.unwrap();
        let org = new_organization(name.into(), slug, email.into(), Subscription::for_plan(PlanTier::Starter, None));
        let owner = new_user("Owner".into(), format!("owner+{}", email), "hash".into(), Role::Owner, Some(org.id));
        admin.insert_organization_with_owner(&org, &owner).await.unwrap();
        (org, owner)
    }

    #[tokio::test]
    async fn slug_collisions_get_a_counter() {
        let store = Store::new(Arc::new(MemoryStore::new()));
        let admin = store.admin();

        let (first, _) = seed(&admin, "Acme Dental", "a@acme.com").await;
        assert_eq!(first.slug, "acme-dental");

        let second = unique_slug(&admin, "ACME dental!").await.unwrap();
        assert_eq!(second, "acme-dental-1");
    }

    #[tokio::test]
    async fn purge_removes_only_organizations_without_users() {
        let store = Store::new(Arc::new(MemoryStore::new()));
        let admin = store.admin();

        let (orphan, last) = seed(&admin, "Orphan", "o@orphan.com").await;
        assert!(store.scoped(orphan.id).delete_user(last.id).await.unwrap());
        let (staffed, _) = seed(&admin, "Staffed", "s@staffed.com").await;

        let cutoff = Utc::now() + Duration::seconds(1);
        let removed = purge_orphans(&admin, cutoff).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, orphan.id);
        assert!(admin.find_organization(orphan.id).await.unwrap().is_none());
        assert!(admin.find_organization(staffed.id).await.unwrap().is_some());
        assert!(find_orphans(&admin, cutoff).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn system_created_organizations_keep_their_owner() {
        let state = AppState::from_config(AppConfig::in_memory("unit-test-secret")).await.unwrap();
        let root = crate::services::auth_service::bootstrap_owner(
            &state.store,
            "Root".into(),
            "root@dentcare.test".into(),
            "secret123".into(),
        )
        .await
        .unwrap();

        let service = OrganizationService::new(&state, CurrentUser::from(root));
        let created = service
            .create(CreateOrganizationRequest {
                name: Some("Branch".into()),
                email: Some("branch@clinic.test".into()),
                owner_name: Some("Branch Owner".into()),
                owner_email: Some("Owner@Branch.test".into()),
                owner_password: Some("secret123".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.owner.role, Role::Owner);
        assert_eq!(created.owner.organization_id, Some(created.organization.id));
        assert_eq!(created.owner.email, "owner@branch.test");

        let admin = state.store.admin();
        let removed = purge_orphans(&admin, Utc::now() + Duration::seconds(1)).await.unwrap();
        assert!(removed.is_empty());
        assert!(admin.find_organization(created.organization.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn organization_creation_requires_owner_credentials() {
        let state = AppState::from_config(AppConfig::in_memory("unit-test-secret")).await.unwrap();
        let root = crate::services::auth_service::bootstrap_owner(
            &state.store,
            "Root".into(),
            "root@dentcare.test".into(),
            "secret123".into(),
        )
        .await
        .unwrap();

        let err = OrganizationService::new(&state, CurrentUser::from(root))
            .create(CreateOrganizationRequest {
                name: Some("Branch".into()),
                email: Some("branch@clinic.test".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            ApiError::ValidationError { field_errors: Some(fields), .. } => {
                assert!(fields.contains_key("ownerName"));
                assert!(fields.contains_key("ownerEmail"));
                assert!(fields.contains_key("ownerPassword"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
