//! Store interface shared by the Postgres and in-memory backends.
//!
//! Handlers never see a backend directly. They get a [`TenantStore`], which
//! can only address users and patients of one organization, or an
//! [`AdminStore`], the single path to organization rows and cross-tenant
//! reads.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Organization, OrganizationFilter, OrganizationQuery, Page, Patient, PatientFilter, PatientQuery, User,
    UserFilter, UserQuery,
};

/// Row visibility of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only rows belonging to this organization
    Organization(Uuid),
    /// Every row; administrative handle only
    System,
}

impl Scope {
    pub fn organization_id(&self) -> Option<Uuid> {
        match self {
            Scope::Organization(id) => Some(*id),
            Scope::System => None,
        }
    }

    /// Whether a row owned by `organization_id` is visible in this scope
    pub fn admits(&self, organization_id: Option<Uuid>) -> bool {
        match self {
            Scope::Organization(id) => organization_id == Some(*id),
            Scope::System => true,
        }
    }
}

#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    // Organizations
    /// Creates the organization and its owning user atomically
    async fn insert_organization_with_owner(&self, org: &Organization, owner: &User) -> Result<(), DatabaseError>;
    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError>;
    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, DatabaseError>;
    async fn find_organization_by_email(&self, email: &str) -> Result<Option<Organization>, DatabaseError>;
    async fn list_organizations(&self, query: &OrganizationQuery) -> Result<Page<Organization>, DatabaseError>;
    async fn count_organizations(&self, filter: &OrganizationFilter) -> Result<i64, DatabaseError>;
    async fn update_organization(&self, org: &Organization) -> Result<(), DatabaseError>;
    async fn toggle_organization_status(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError>;
    async fn delete_organization(&self, id: Uuid) -> Result<bool, DatabaseError>;
    /// Organizations without a single user, created before `created_before`
    async fn list_orphan_organizations(&self, created_before: DateTime<Utc>) -> Result<Vec<Organization>, DatabaseError>;

    // Users
    async fn insert_user(&self, scope: Scope, user: &User) -> Result<(), DatabaseError>;
    async fn find_user(&self, scope: Scope, id: Uuid) -> Result<Option<User>, DatabaseError>;
    /// Email is unique system-wide, so this lookup is never tenant scoped
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    async fn list_users(&self, scope: Scope, query: &UserQuery) -> Result<Page<User>, DatabaseError>;
    async fn count_users(&self, scope: Scope, filter: &UserFilter) -> Result<i64, DatabaseError>;
    async fn update_user(&self, scope: Scope, user: &User) -> Result<(), DatabaseError>;
    async fn toggle_user_status(&self, scope: Scope, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn delete_user(&self, scope: Scope, id: Uuid) -> Result<bool, DatabaseError>;
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DatabaseError>;

    // Patients
    async fn insert_patient(&self, scope: Scope, patient: &Patient) -> Result<(), DatabaseError>;
    async fn find_patient(&self, scope: Scope, id: Uuid) -> Result<Option<Patient>, DatabaseError>;
    async fn find_patient_by_document(&self, scope: Scope, document: &str) -> Result<Option<Patient>, DatabaseError>;
    async fn find_patient_by_email(&self, scope: Scope, email: &str) -> Result<Option<Patient>, DatabaseError>;
    async fn list_patients(&self, scope: Scope, query: &PatientQuery) -> Result<Page<Patient>, DatabaseError>;
    async fn count_patients(&self, scope: Scope, filter: &PatientFilter) -> Result<i64, DatabaseError>;
    async fn update_patient(&self, scope: Scope, patient: &Patient) -> Result<(), DatabaseError>;
    async fn toggle_patient_status(&self, scope: Scope, id: Uuid) -> Result<Option<Patient>, DatabaseError>;
}

/// Cheap cloneable handle to the configured backend
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StoreBackend>,
}

impl Store {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Restricted handle bound to one organization
    pub fn scoped(&self, organization_id: Uuid) -> TenantStore {
        TenantStore { backend: self.backend.clone(), organization_id }
    }

    /// Administrative handle that sees every row
    pub fn admin(&self) -> AdminStore {
        AdminStore { backend: self.backend.clone() }
    }

    pub async fn ping(&self) -> Result<(), DatabaseError> {
        self.backend.ping().await
    }
}

/// Users and patients of a single organization
#[derive(Clone)]
pub struct TenantStore {
    backend: Arc<dyn StoreBackend>,
    organization_id: Uuid,
}

impl TenantStore {
    pub fn organization_id(&self) -> Uuid {
        self.organization_id
    }

    fn scope(&self) -> Scope {
        Scope::Organization(self.organization_id)
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        if user.organization_id != Some(self.organization_id) {
            return Err(DatabaseError::QueryError("user belongs to another organization".to_string()));
        }
        self.backend.insert_user(self.scope(), user).await
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        self.backend.find_user(self.scope(), id).await
    }

    pub async fn list_users(&self, query: &UserQuery) -> Result<Page<User>, DatabaseError> {
        self.backend.list_users(self.scope(), query).await
    }

    pub async fn count_users(&self, filter: &UserFilter) -> Result<i64, DatabaseError> {
        self.backend.count_users(self.scope(), filter).await
    }

    pub async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.backend.update_user(self.scope(), user).await
    }

    pub async fn toggle_user_status(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        self.backend.toggle_user_status(self.scope(), id).await
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.backend.delete_user(self.scope(), id).await
    }

    pub async fn insert_patient(&self, patient: &Patient) -> Result<(), DatabaseError> {
        if patient.organization_id != self.organization_id {
            return Err(DatabaseError::QueryError("patient belongs to another organization".to_string()));
        }
        self.backend.insert_patient(self.scope(), patient).await
    }

    pub async fn find_patient(&self, id: Uuid) -> Result<Option<Patient>, DatabaseError> {
        self.backend.find_patient(self.scope(), id).await
    }

    pub async fn find_patient_by_document(&self, document: &str) -> Result<Option<Patient>, DatabaseError> {
        self.backend.find_patient_by_document(self.scope(), document).await
    }

    pub async fn find_patient_by_email(&self, email: &str) -> Result<Option<Patient>, DatabaseError> {
        self.backend.find_patient_by_email(self.scope(), email).await
    }

    pub async fn list_patients(&self, query: &PatientQuery) -> Result<Page<Patient>, DatabaseError> {
        self.backend.list_patients(self.scope(), query).await
    }

    pub async fn count_patients(&self, filter: &PatientFilter) -> Result<i64, DatabaseError> {
        self.backend.count_patients(self.scope(), filter).await
    }

    pub async fn update_patient(&self, patient: &Patient) -> Result<(), DatabaseError> {
        self.backend.update_patient(self.scope(), patient).await
    }

    pub async fn toggle_patient_status(&self, id: Uuid) -> Result<Option<Patient>, DatabaseError> {
        self.backend.toggle_patient_status(self.scope(), id).await
    }
}

/// Organization rows and cross-tenant lookups
#[derive(Clone)]
pub struct AdminStore {
    backend: Arc<dyn StoreBackend>,
}

impl AdminStore {
    pub async fn insert_organization_with_owner(&self, org: &Organization, owner: &User) -> Result<(), DatabaseError> {
        self.backend.insert_organization_with_owner(org, owner).await
    }

    pub async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        self.backend.find_organization(id).await
    }

    pub async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, DatabaseError> {
        self.backend.find_organization_by_slug(slug).await
    }

    pub async fn find_organization_by_email(&self, email: &str) -> Result<Option<Organization>, DatabaseError> {
        self.backend.find_organization_by_email(email).await
    }

    pub async fn list_organizations(&self, query: &OrganizationQuery) -> Result<Page<Organization>, DatabaseError> {
        self.backend.list_organizations(query).await
    }

    pub async fn count_organizations(&self, filter: &OrganizationFilter) -> Result<i64, DatabaseError> {
        self.backend.count_organizations(filter).await
    }

    pub async fn update_organization(&self, org: &Organization) -> Result<(), DatabaseError> {
        self.backend.update_organization(org).await
    }

    pub async fn toggle_organization_status(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        self.backend.toggle_organization_status(id).await
    }

    pub async fn delete_organization(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.backend.delete_organization(id).await
    }

    pub async fn list_orphan_organizations(&self, created_before: DateTime<Utc>) -> Result<Vec<Organization>, DatabaseError> {
        self.backend.list_orphan_organizations(created_before).await
    }

    /// Users of `organization_id`, or of every organization when `None`
    pub async fn count_users(&self, organization_id: Option<Uuid>, filter: &UserFilter) -> Result<i64, DatabaseError> {
        self.backend.count_users(organization_id.map(Scope::Organization).unwrap_or(Scope::System), filter).await
    }

    pub async fn count_patients(&self, organization_id: Option<Uuid>, filter: &PatientFilter) -> Result<i64, DatabaseError> {
        self.backend.count_patients(organization_id.map(Scope::Organization).unwrap_or(Scope::System), filter).await
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.backend.insert_user(Scope::System, user).await
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        self.backend.find_user(Scope::System, id).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        self.backend.find_user_by_email(email).await
    }

    pub async fn update_user(&self, user: &User) -> Result<(), DatabaseError> {
        self.backend.update_user(Scope::System, user).await
    }

    pub async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        self.backend.record_login(id, at).await
    }
}
