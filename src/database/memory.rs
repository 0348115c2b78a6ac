//! In-memory store for demos and tests.
//!
//! Only reachable when `STORE_BACKEND=memory` is set explicitly (or from test
//! code). It enforces the same unique constraints and tenant scoping as the
//! Postgres schema so the services behave identically on both backends.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Organization, OrganizationFilter, OrganizationQuery, Page, Patient, PatientFilter, PatientQuery, User,
    UserFilter, UserQuery,
};
use crate::database::store::{Scope, StoreBackend};

#[derive(Default)]
struct Tables {
    organizations: HashMap<Uuid, Organization>,
    users: HashMap<Uuid, User>,
    patients: HashMap<Uuid, Patient>,
}

impl Tables {
    fn check_organization(&self, org: &Organization) -> Result<(), DatabaseError> {
        for other in self.organizations.values().filter(|o| o.id != org.id) {
            if other.slug == org.slug {
                return Err(DatabaseError::Duplicate("organizations_slug_key".to_string()));
            }
            if other.email == org.email {
                return Err(DatabaseError::Duplicate("organizations_email_key".to_string()));
            }
        }
        Ok(())
    }

    fn check_user(&self, user: &User) -> Result<(), DatabaseError> {
        if self.users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(DatabaseError::Duplicate("users_email_key".to_string()));
        }
        if let Some(org_id) = user.organization_id {
            if !self.organizations.contains_key(&org_id) {
                return Err(DatabaseError::QueryError(format!("organization {} does not exist", org_id)));
            }
        }
        Ok(())
    }

    fn check_patient(&self, patient: &Patient) -> Result<(), DatabaseError> {
        if !self.organizations.contains_key(&patient.organization_id) {
            return Err(DatabaseError::QueryError(format!(
                "organization {} does not exist",
                patient.organization_id
            )));
        }
        let siblings = self
            .patients
            .values()
            .filter(|p| p.id != patient.id && p.organization_id == patient.organization_id);
        for other in siblings {
            if patient.document.is_some() && other.document == patient.document {
                return Err(DatabaseError::Duplicate("patients_org_document_key".to_string()));
            }
            if patient.email.is_some() && other.email == patient.email {
                return Err(DatabaseError::Duplicate("patients_org_email_key".to_string()));
            }
        }
        Ok(())
    }

    fn scoped_users<'a>(&'a self, scope: Scope) -> impl Iterator<Item = &'a User> + 'a {
        self.users.values().filter(move |u| scope.admits(u.organization_id))
    }

    fn scoped_patients<'a>(&'a self, scope: Scope) -> impl Iterator<Item = &'a Patient> + 'a {
        self.patients.values().filter(move |p| scope.admits(Some(p.organization_id)))
    }
}

fn rejected_by_scope(what: &str) -> DatabaseError {
    DatabaseError::QueryError(format!("{} is outside the current organization scope", what))
}

/// Newest first, id as tie breaker
fn newest_first<T, F>(rows: &mut [T], key: F)
where
    F: Fn(&T) -> (DateTime<Utc>, Uuid),
{
    rows.sort_by_key(|row| {
        let (created_at, id) = key(row);
        (Reverse(created_at), id)
    });
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn insert_organization_with_owner(&self, org: &Organization, owner: &User) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.check_organization(org)?;
        tables.organizations.insert(org.id, org.clone());
        if let Err(e) = tables.check_user(owner) {
            tables.organizations.remove(&org.id);
            return Err(e);
        }
        tables.users.insert(owner.id, owner.clone());
        Ok(())
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        Ok(self.tables.read().await.organizations.get(&id).cloned())
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.organizations.values().find(|o| o.slug == slug).cloned())
    }

    async fn find_organization_by_email(&self, email: &str) -> Result<Option<Organization>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.organizations.values().find(|o| o.email == email).cloned())
    }

    async fn list_organizations(&self, query: &OrganizationQuery) -> Result<Page<Organization>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Organization> = tables
            .organizations
            .values()
            .filter(|o| query.filter.matches(o))
            .cloned()
            .collect();
        newest_first(&mut rows, |o| (o.created_at, o.id));
        Ok(Page::slice(rows, query.pagination))
    }

    async fn count_organizations(&self, filter: &OrganizationFilter) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.organizations.values().filter(|o| filter.matches(o)).count() as i64)
    }

    async fn update_organization(&self, org: &Organization) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.organizations.contains_key(&org.id) {
            return Err(DatabaseError::NotFound("Organization not found".to_string()));
        }
        tables.check_organization(org)?;
        tables.organizations.insert(org.id, org.clone());
        Ok(())
    }

    async fn toggle_organization_status(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables.organizations.get_mut(&id).map(|org| {
            org.is_active = !org.is_active;
            org.updated_at = Utc::now();
            org.clone()
        }))
    }

    async fn delete_organization(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let referenced = tables.users.values().any(|u| u.organization_id == Some(id))
            || tables.patients.values().any(|p| p.organization_id == id);
        if referenced {
            return Err(DatabaseError::QueryError(format!("organization {} is still referenced", id)));
        }
        Ok(tables.organizations.remove(&id).is_some())
    }

    async fn list_orphan_organizations(&self, created_before: DateTime<Utc>) -> Result<Vec<Organization>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Organization> = tables
            .organizations
            .values()
            .filter(|o| o.created_at < created_before)
            .filter(|o| !tables.users.values().any(|u| u.organization_id == Some(o.id)))
            .cloned()
            .collect();
        newest_first(&mut rows, |o| (o.created_at, o.id));
        Ok(rows)
    }

    async fn insert_user(&self, scope: Scope, user: &User) -> Result<(), DatabaseError> {
        if !scope.admits(user.organization_id) {
            return Err(rejected_by_scope("user"));
        }
        let mut tables = self.tables.write().await;
        tables.check_user(user)?;
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, scope: Scope, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        let found = tables.scoped_users(scope).find(|u| u.id == id).cloned();
        Ok(found)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, scope: Scope, query: &UserQuery) -> Result<Page<User>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<User> = tables
            .scoped_users(scope)
            .filter(|u| query.filter.matches(u))
            .cloned()
            .collect();
        newest_first(&mut rows, |u| (u.created_at, u.id));
        Ok(Page::slice(rows, query.pagination))
    }

    async fn count_users(&self, scope: Scope, filter: &UserFilter) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.scoped_users(scope).filter(|u| filter.matches(u)).count() as i64)
    }

    async fn update_user(&self, scope: Scope, user: &User) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let visible = tables
            .users
            .get(&user.id)
            .map(|existing| scope.admits(existing.organization_id))
            .unwrap_or(false);
        if !visible {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        if !scope.admits(user.organization_id) {
            return Err(rejected_by_scope("user"));
        }
        tables.check_user(user)?;
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn toggle_user_status(&self, scope: Scope, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .users
            .get_mut(&id)
            .filter(|u| scope.admits(u.organization_id))
            .map(|user| {
                user.is_active = !user.is_active;
                user.updated_at = Utc::now();
                user.clone()
            }))
    }

    async fn delete_user(&self, scope: Scope, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let visible = tables
            .users
            .get(&id)
            .map(|u| scope.admits(u.organization_id))
            .unwrap_or(false);
        if !visible {
            return Ok(false);
        }
        Ok(tables.users.remove(&id).is_some())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn insert_patient(&self, scope: Scope, patient: &Patient) -> Result<(), DatabaseError> {
        if !scope.admits(Some(patient.organization_id)) {
            return Err(rejected_by_scope("patient"));
        }
        let mut tables = self.tables.write().await;
        tables.check_patient(patient)?;
        tables.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn find_patient(&self, scope: Scope, id: Uuid) -> Result<Option<Patient>, DatabaseError> {
        let tables = self.tables.read().await;
        let found = tables.scoped_patients(scope).find(|p| p.id == id).cloned();
        Ok(found)
    }

    async fn find_patient_by_document(&self, scope: Scope, document: &str) -> Result<Option<Patient>, DatabaseError> {
        let tables = self.tables.read().await;
        let found = tables
            .scoped_patients(scope)
            .find(|p| p.document.as_deref() == Some(document))
            .cloned();
        Ok(found)
    }

    async fn find_patient_by_email(&self, scope: Scope, email: &str) -> Result<Option<Patient>, DatabaseError> {
        let tables = self.tables.read().await;
        let found = tables
            .scoped_patients(scope)
            .find(|p| p.email.as_deref() == Some(email))
            .cloned();
        Ok(found)
    }

    async fn list_patients(&self, scope: Scope, query: &PatientQuery) -> Result<Page<Patient>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Patient> = tables
            .scoped_patients(scope)
            .filter(|p| query.filter.matches(p))
            .cloned()
            .collect();
        newest_first(&mut rows, |p| (p.created_at, p.id));
        Ok(Page::slice(rows, query.pagination))
    }

    async fn count_patients(&self, scope: Scope, filter: &PatientFilter) -> Result<i64, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.scoped_patients(scope).filter(|p| filter.matches(p)).count() as i64)
    }

    async fn update_patient(&self, scope: Scope, patient: &Patient) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        let visible = tables
            .patients
            .get(&patient.id)
            .map(|existing| scope.admits(Some(existing.organization_id)) && existing.organization_id == patient.organization_id)
            .unwrap_or(false);
        if !visible {
            return Err(DatabaseError::NotFound("Patient not found".to_string()));
        }
        tables.check_patient(patient)?;
        tables.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn toggle_patient_status(&self, scope: Scope, id: Uuid) -> Result<Option<Patient>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .patients
            .get_mut(&id)
            .filter(|p| scope.admits(Some(p.organization_id)))
            .map(|patient| {
                patient.is_active = !patient.is_active;
                patient.updated_at = Utc::now();
                patient.clone()
            }))
    }
}
