use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::common::{contains_folded, Pagination};
use crate::database::manager::DatabaseError;
use crate::permissions::{parse_permissions, PermissionSet};
use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub organization_id: Option<Uuid>,
    pub permissions: PermissionSet,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub profile: UserProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Owner without an organization: the operator-bootstrapped account
    pub fn is_system(&self) -> bool {
        self.role == Role::Owner && self.organization_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub license_number: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub organization_id: Option<Uuid>,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub profile: Json<UserProfile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| DatabaseError::CorruptRow(format!("user {}: {}", row.id, e)))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            organization_id: row.organization_id,
            permissions: parse_permissions(&row.permissions),
            is_active: row.is_active,
            last_login: row.last_login,
            profile: row.profile.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Partial match on name or email
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if self.role.map(|r| r != user.role).unwrap_or(false) {
            return false;
        }
        if self.is_active.map(|a| a != user.is_active).unwrap_or(false) {
            return false;
        }
        if let Some(term) = self.search.as_deref() {
            let term = term.to_lowercase();
            if !(contains_folded(Some(&user.name), &term) || contains_folded(Some(&user.email), &term)) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct UserQuery {
    pub filter: UserFilter,
    pub pagination: Pagination,
}

/// Fields an administrator may change on another account
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub permissions: Option<PermissionSet>,
    pub is_active: Option<bool>,
    pub profile: Option<UserProfile>,
    pub password: Option<String>,
}

/// Fields a user may change on their own account
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub profile: Option<UserProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::default_permissions_for;

    fn user(role: Role, organization_id: Option<Uuid>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Ana Souza".to_string(),
            email: "ana@clinic.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
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

    #[test]
    fn password_hash_never_serialized() {
        let json = serde_json::to_value(user(Role::Dentist, Some(Uuid::new_v4()))).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["role"], "dentist");
        assert!(json["permissions"].as_array().unwrap().contains(&"patients.read".into()));
    }

    #[test]
    fn only_unaffiliated_owner_is_system() {
        assert!(user(Role::Owner, None).is_system());
        assert!(!user(Role::Owner, Some(Uuid::new_v4())).is_system());
        assert!(!user(Role::Admin, None).is_system());
    }

    #[test]
    fn filter_matches_search_case_insensitively() {
        let u = user(Role::Secretary, None);
        let filter = UserFilter { search: Some("SOUZA".into()), ..Default::default() };
        assert!(filter.matches(&u));
        let filter = UserFilter { role: Some(Role::Admin), ..Default::default() };
        assert!(!filter.matches(&u));
    }
}
