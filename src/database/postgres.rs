//! Postgres backend.
//!
//! Organization-scoped calls run on the restricted pool inside a transaction
//! that first sets `app.organization_id`, which the row-level-security
//! policies read. They also filter on `organization_id` explicitly. System
//! scope and every organization-table call use the administrative pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, Postgres, Transaction};
use uuid::Uuid;

use crate::database::manager::{map_read_error, map_write_error, DatabaseError, DatabaseManager};
use crate::database::models::{
    Organization, OrganizationFilter, OrganizationQuery, OrganizationRow, Page, Pagination, Patient, PatientFilter,
    PatientQuery, PatientRow, User, UserFilter, UserQuery, UserRow,
};
use crate::database::query_builder;
use crate::database::repository::Repository;
use crate::database::store::{Scope, StoreBackend};
use crate::filter::{Filter, SqlParam, SqlResult};
use crate::permissions::permission_strings;

const DEFAULT_ORDER: &str = "created_at desc, id asc";

fn organizations() -> Repository<OrganizationRow, Organization> {
    Repository::new("organizations")
}

fn users() -> Repository<UserRow, User> {
    Repository::new("users")
}

fn patients() -> Repository<PatientRow, Patient> {
    Repository::new("patients")
}

fn scope_filter(filter: &mut Filter, scope: Scope) -> Result<(), DatabaseError> {
    if let Some(org_id) = scope.organization_id() {
        filter.where_eq("organization_id", org_id)?;
    }
    Ok(())
}

fn paginate(filter: &mut Filter, pagination: Pagination) -> Result<(), DatabaseError> {
    filter.order(DEFAULT_ORDER)?;
    filter.limit(pagination.limit as i64, Some(pagination.offset()))?;
    Ok(())
}

fn organization_filter(f: &OrganizationFilter) -> Result<Filter, DatabaseError> {
    let mut filter = organizations().filter()?;
    if let Some(active) = f.is_active {
        filter.where_eq("is_active", active)?;
    }
    if let Some(plan) = f.plan {
        filter.where_eq("plan", plan.as_str())?;
    }
    if let Some(term) = f.search.as_deref() {
        filter.search(&["name", "email", "slug"], term)?;
    }
    Ok(filter)
}

fn user_filter(scope: Scope, f: &UserFilter) -> Result<Filter, DatabaseError> {
    let mut filter = users().filter()?;
    scope_filter(&mut filter, scope)?;
    if let Some(role) = f.role {
        filter.where_eq("role", role.as_str())?;
    }
    if let Some(active) = f.is_active {
        filter.where_eq("is_active", active)?;
    }
    if let Some(term) = f.search.as_deref() {
        filter.search(&["name", "email"], term)?;
    }
    Ok(filter)
}

fn patient_filter(scope: Scope, f: &PatientFilter) -> Result<Filter, DatabaseError> {
    let mut filter = patients().filter()?;
    scope_filter(&mut filter, scope)?;
    if let Some(gender) = f.gender {
        filter.where_eq("gender", gender.as_str())?;
    }
    if let Some(active) = f.is_active {
        filter.where_eq("is_active", active)?;
    }
    if let Some(term) = f.search.as_deref() {
        filter.search(&["name", "email", "document", "phone"], term)?;
    }
    Ok(filter)
}

/// ` AND organization_id = $n` for organization scope, nothing for system scope
fn scope_clause(scope: Scope, param_index: usize) -> String {
    match scope {
        Scope::Organization(_) => format!(" AND organization_id = ${}", param_index),
        Scope::System => String::new(),
    }
}

const INSERT_ORGANIZATION: &str = "INSERT INTO organizations \
    (id, name, slug, document, email, phone, address, plan, max_users, max_patients, features, \
     subscription_expires_at, subscription_active, settings, is_active, created_by, created_at, updated_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)";

const UPDATE_ORGANIZATION: &str = "UPDATE organizations SET \
    name = $2, document = $3, email = $4, phone = $5, address = $6, plan = $7, max_users = $8, \
    max_patients = $9, features = $10, subscription_expires_at = $11, subscription_active = $12, \
    settings = $13, is_active = $14, updated_at = $15 \
    WHERE id = $1";

const INSERT_USER: &str = "INSERT INTO users \
    (id, name, email, password_hash, role, organization_id, permissions, is_active, last_login, profile, \
     created_at, updated_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)";

const UPDATE_USER: &str = "UPDATE users SET \
    name = $2, email = $3, password_hash = $4, role = $5, permissions = $6, is_active = $7, \
    profile = $8, updated_at = $9 \
    WHERE id = $1";

const INSERT_PATIENT: &str = "INSERT INTO patients \
    (id, organization_id, name, email, phone, document, birth_date, gender, address, medical_info, \
     emergency_contact, notes, created_by, is_active, created_at, updated_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)";

const UPDATE_PATIENT: &str = "UPDATE patients SET \
    name = $2, email = $3, phone = $4, document = $5, birth_date = $6, gender = $7, address = $8, \
    medical_info = $9, emergency_contact = $10, notes = $11, is_active = $12, updated_at = $13 \
    WHERE id = $1";

async fn insert_organization_on(conn: &mut PgConnection, org: &Organization) -> Result<(), DatabaseError> {
    sqlx::query(INSERT_ORGANIZATION)
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.slug)
        .bind(&org.document)
        .bind(&org.email)
        .bind(&org.phone)
        .bind(Json(&org.address))
        .bind(org.subscription.plan.as_str())
        .bind(org.subscription.max_users)
        .bind(org.subscription.max_patients)
        .bind(&org.subscription.features)
        .bind(org.subscription.expires_at)
        .bind(org.subscription.is_active)
        .bind(Json(&org.settings))
        .bind(org.is_active)
        .bind(org.created_by)
        .bind(org.created_at)
        .bind(org.updated_at)
        .execute(conn)
        .await
        .map_err(map_write_error)?;
    Ok(())
}

async fn insert_user_on(conn: &mut PgConnection, user: &User) -> Result<(), DatabaseError> {
    sqlx::query(INSERT_USER)
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.organization_id)
        .bind(permission_strings(&user.permissions))
        .bind(user.is_active)
        .bind(user.last_login)
        .bind(Json(&user.profile))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(conn)
        .await
        .map_err(map_write_error)?;
    Ok(())
}

pub struct PgStore {
    db: DatabaseManager,
}

impl PgStore {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub fn manager(&self) -> &DatabaseManager {
        &self.db
    }

    /// Open a transaction whose visibility matches `scope`
    async fn begin(&self, scope: Scope) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        match scope {
            Scope::Organization(org_id) => {
                let mut tx = self.db.restricted_pool().begin().await.map_err(map_read_error)?;
                sqlx::query("SELECT set_config('app.organization_id', $1, true)")
                    .bind(org_id.to_string())
                    .execute(&mut *tx)
                    .await
                    .map_err(map_read_error)?;
                Ok(tx)
            }
            Scope::System => self.db.admin_pool().begin().await.map_err(map_read_error),
        }
    }

    async fn admin(&self) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        self.begin(Scope::System).await
    }
}

#[async_trait]
impl StoreBackend for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.db.health_check().await
    }

    async fn insert_organization_with_owner(&self, org: &Organization, owner: &User) -> Result<(), DatabaseError> {
        let mut tx = self.admin().await?;
        insert_organization_on(&mut tx, org).await?;
        insert_user_on(&mut tx, owner).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let mut filter = organizations().filter()?;
        filter.where_eq("id", id)?;
        let mut tx = self.admin().await?;
        let org = organizations().select_one(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(org)
    }

    async fn find_organization_by_slug(&self, slug: &str) -> Result<Option<Organization>, DatabaseError> {
        let mut filter = organizations().filter()?;
        filter.where_eq("slug", slug)?;
        let mut tx = self.admin().await?;
        let org = organizations().select_one(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(org)
    }

    async fn find_organization_by_email(&self, email: &str) -> Result<Option<Organization>, DatabaseError> {
        let mut filter = organizations().filter()?;
        filter.where_eq("email", email)?;
        let mut tx = self.admin().await?;
        let org = organizations().select_one(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(org)
    }

    async fn list_organizations(&self, query: &OrganizationQuery) -> Result<Page<Organization>, DatabaseError> {
        let mut filter = organization_filter(&query.filter)?;
        paginate(&mut filter, query.pagination)?;
        let mut tx = self.admin().await?;
        let page = organizations().page(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(page)
    }

    async fn count_organizations(&self, filter: &OrganizationFilter) -> Result<i64, DatabaseError> {
        let filter = organization_filter(filter)?;
        let mut tx = self.admin().await?;
        let count = organizations().count(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn update_organization(&self, org: &Organization) -> Result<(), DatabaseError> {
        let mut tx = self.admin().await?;
        let result = sqlx::query(UPDATE_ORGANIZATION)
            .bind(org.id)
            .bind(&org.name)
            .bind(&org.document)
            .bind(&org.email)
            .bind(&org.phone)
            .bind(Json(&org.address))
            .bind(org.subscription.plan.as_str())
            .bind(org.subscription.max_users)
            .bind(org.subscription.max_patients)
            .bind(&org.subscription.features)
            .bind(org.subscription.expires_at)
            .bind(org.subscription.is_active)
            .bind(Json(&org.settings))
            .bind(org.is_active)
            .bind(org.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Organization not found".to_string()));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn toggle_organization_status(&self, id: Uuid) -> Result<Option<Organization>, DatabaseError> {
        let sql = SqlResult {
            query: "UPDATE organizations SET is_active = NOT is_active, updated_at = $2 WHERE id = $1 RETURNING *"
                .to_string(),
            params: vec![id.into(), Utc::now().into()],
        };
        let mut tx = self.admin().await?;
        let row: Option<OrganizationRow> = query_builder::fetch_optional(&mut tx, &sql).await?;
        tx.commit().await?;
        row.map(Organization::try_from).transpose()
    }

    async fn delete_organization(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tx = self.admin().await?;
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_orphan_organizations(&self, created_before: DateTime<Utc>) -> Result<Vec<Organization>, DatabaseError> {
        let sql = SqlResult {
            query: "SELECT o.* FROM organizations o \
                    WHERE o.created_at < $1 \
                    AND NOT EXISTS (SELECT 1 FROM users u WHERE u.organization_id = o.id) \
                    ORDER BY o.created_at DESC"
                .to_string(),
            params: vec![created_before.into()],
        };
        let mut tx = self.admin().await?;
        let rows: Vec<OrganizationRow> = query_builder::fetch_all(&mut tx, &sql).await?;
        tx.commit().await?;
        rows.into_iter().map(Organization::try_from).collect()
    }

    async fn insert_user(&self, scope: Scope, user: &User) -> Result<(), DatabaseError> {
        if !scope.admits(user.organization_id) {
            return Err(DatabaseError::QueryError("user is outside the current organization scope".to_string()));
        }
        let mut tx = self.begin(scope).await?;
        insert_user_on(&mut tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_user(&self, scope: Scope, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let mut filter = user_filter(scope, &UserFilter::default())?;
        filter.where_eq("id", id)?;
        let mut tx = self.begin(scope).await?;
        let user = users().select_one(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let mut filter = users().filter()?;
        filter.where_eq("email", email)?;
        let mut tx = self.admin().await?;
        let user = users().select_one(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(user)
    }

    async fn list_users(&self, scope: Scope, query: &UserQuery) -> Result<Page<User>, DatabaseError> {
        let mut filter = user_filter(scope, &query.filter)?;
        paginate(&mut filter, query.pagination)?;
        let mut tx = self.begin(scope).await?;
        let page = users().page(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(page)
    }

    async fn count_users(&self, scope: Scope, filter: &UserFilter) -> Result<i64, DatabaseError> {
        let filter = user_filter(scope, filter)?;
        let mut tx = self.begin(scope).await?;
        let count = users().count(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn update_user(&self, scope: Scope, user: &User) -> Result<(), DatabaseError> {
        let sql = format!("{}{}", UPDATE_USER, scope_clause(scope, 10));
        let mut query = sqlx::query(&sql)
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(permission_strings(&user.permissions))
            .bind(user.is_active)
            .bind(Json(&user.profile))
            .bind(user.updated_at);
        if let Some(org_id) = scope.organization_id() {
            query = query.bind(org_id);
        }

        let mut tx = self.begin(scope).await?;
        let result = query.execute(&mut *tx).await.map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn toggle_user_status(&self, scope: Scope, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let mut params: Vec<SqlParam> = vec![id.into(), Utc::now().into()];
        params.extend(scope.organization_id().map(Into::into));
        let sql = SqlResult {
            query: format!(
                "UPDATE users SET is_active = NOT is_active, updated_at = $2 WHERE id = $1{} RETURNING *",
                scope_clause(scope, 3)
            ),
            params,
        };
        let mut tx = self.begin(scope).await?;
        let row: Option<UserRow> = query_builder::fetch_optional(&mut tx, &sql).await?;
        tx.commit().await?;
        row.map(User::try_from).transpose()
    }

    async fn delete_user(&self, scope: Scope, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM users WHERE id = $1{}", scope_clause(scope, 2));
        let mut query = sqlx::query(&sql).bind(id);
        if let Some(org_id) = scope.organization_id() {
            query = query.bind(org_id);
        }
        let mut tx = self.begin(scope).await?;
        let result = query.execute(&mut *tx).await.map_err(map_write_error)?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        let mut tx = self.admin().await?;
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_patient(&self, scope: Scope, patient: &Patient) -> Result<(), DatabaseError> {
        if !scope.admits(Some(patient.organization_id)) {
            return Err(DatabaseError::QueryError("patient is outside the current organization scope".to_string()));
        }
        let mut tx = self.begin(scope).await?;
        sqlx::query(INSERT_PATIENT)
            .bind(patient.id)
            .bind(patient.organization_id)
            .bind(&patient.name)
            .bind(&patient.email)
            .bind(&patient.phone)
            .bind(&patient.document)
            .bind(patient.birth_date)
            .bind(patient.gender.map(|g| g.as_str()))
            .bind(Json(&patient.address))
            .bind(Json(&patient.medical_info))
            .bind(Json(&patient.emergency_contact))
            .bind(&patient.notes)
            .bind(patient.created_by)
            .bind(patient.is_active)
            .bind(patient.created_at)
            .bind(patient.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_patient(&self, scope: Scope, id: Uuid) -> Result<Option<Patient>, DatabaseError> {
        let mut filter = patient_filter(scope, &PatientFilter::default())?;
        filter.where_eq("id", id)?;
        let mut tx = self.begin(scope).await?;
        let patient = patients().select_one(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(patient)
    }

    async fn find_patient_by_document(&self, scope: Scope, document: &str) -> Result<Option<Patient>, DatabaseError> {
        let mut filter = patient_filter(scope, &PatientFilter::default())?;
        filter.where_eq("document", document)?;
        let mut tx = self.begin(scope).await?;
        let patient = patients().select_one(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(patient)
    }

    async fn find_patient_by_email(&self, scope: Scope, email: &str) -> Result<Option<Patient>, DatabaseError> {
        let mut filter = patient_filter(scope, &PatientFilter::default())?;
        filter.where_eq("email", email)?;
        let mut tx = self.begin(scope).await?;
        let patient = patients().select_one(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(patient)
    }

    async fn list_patients(&self, scope: Scope, query: &PatientQuery) -> Result<Page<Patient>, DatabaseError> {
        let mut filter = patient_filter(scope, &query.filter)?;
        paginate(&mut filter, query.pagination)?;
        let mut tx = self.begin(scope).await?;
        let page = patients().page(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(page)
    }

    async fn count_patients(&self, scope: Scope, filter: &PatientFilter) -> Result<i64, DatabaseError> {
        let filter = patient_filter(scope, filter)?;
        let mut tx = self.begin(scope).await?;
        let count = patients().count(&mut tx, &filter).await?;
        tx.commit().await?;
        Ok(count)
    }

    async fn update_patient(&self, scope: Scope, patient: &Patient) -> Result<(), DatabaseError> {
        let sql = format!("{}{}", UPDATE_PATIENT, scope_clause(scope, 14));
        let mut query = sqlx::query(&sql)
            .bind(patient.id)
            .bind(&patient.name)
            .bind(&patient.email)
            .bind(&patient.phone)
            .bind(&patient.document)
            .bind(patient.birth_date)
            .bind(patient.gender.map(|g| g.as_str()))
            .bind(Json(&patient.address))
            .bind(Json(&patient.medical_info))
            .bind(Json(&patient.emergency_contact))
            .bind(&patient.notes)
            .bind(patient.is_active)
            .bind(patient.updated_at);
        if let Some(org_id) = scope.organization_id() {
            query = query.bind(org_id);
        }

        let mut tx = self.begin(scope).await?;
        let result = query.execute(&mut *tx).await.map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Patient not found".to_string()));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn toggle_patient_status(&self, scope: Scope, id: Uuid) -> Result<Option<Patient>, DatabaseError> {
        let mut params: Vec<SqlParam> = vec![id.into(), Utc::now().into()];
        params.extend(scope.organization_id().map(Into::into));
        let sql = SqlResult {
            query: format!(
                "UPDATE patients SET is_active = NOT is_active, updated_at = $2 WHERE id = $1{} RETURNING *",
                scope_clause(scope, 3)
            ),
            params,
        };
        let mut tx = self.begin(scope).await?;
        let row: Option<PatientRow> = query_builder::fetch_optional(&mut tx, &sql).await?;
        tx.commit().await?;
        row.map(Patient::try_from).transpose()
    }
}
