//! Capability tags and the canonical role → permission table.
//!
//! Permissions travel on the wire and in storage as `resource.action`
//! strings, but inside the service they are a closed enum so the role table
//! below is checked for exhaustiveness by the compiler.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{Role, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    UsersCreate,
    UsersRead,
    UsersUpdate,
    UsersDelete,
    PatientsCreate,
    PatientsRead,
    PatientsUpdate,
    PatientsDelete,
    AppointmentsCreate,
    AppointmentsRead,
    AppointmentsUpdate,
    AppointmentsDelete,
    OrganizationManage,
    ReportsRead,
    SettingsUpdate,
}

pub type PermissionSet = BTreeSet<Permission>;

impl Permission {
    pub const ALL: [Permission; 15] = [
        Permission::UsersCreate,
        Permission::UsersRead,
        Permission::UsersUpdate,
        Permission::UsersDelete,
        Permission::PatientsCreate,
        Permission::PatientsRead,
        Permission::PatientsUpdate,
        Permission::PatientsDelete,
        Permission::AppointmentsCreate,
        Permission::AppointmentsRead,
        Permission::AppointmentsUpdate,
        Permission::AppointmentsDelete,
        Permission::OrganizationManage,
        Permission::ReportsRead,
        Permission::SettingsUpdate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UsersCreate => "users.create",
            Permission::UsersRead => "users.read",
            Permission::UsersUpdate => "users.update",
            Permission::UsersDelete => "users.delete",
            Permission::PatientsCreate => "patients.create",
            Permission::PatientsRead => "patients.read",
            Permission::PatientsUpdate => "patients.update",
            Permission::PatientsDelete => "patients.delete",
            Permission::AppointmentsCreate => "appointments.create",
            Permission::AppointmentsRead => "appointments.read",
            Permission::AppointmentsUpdate => "appointments.update",
            Permission::AppointmentsDelete => "appointments.delete",
            Permission::OrganizationManage => "organization.manage",
            Permission::ReportsRead => "reports.read",
            Permission::SettingsUpdate => "settings.update",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("permission", s))
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

const CRUD_USERS: [Permission; 4] = [
    Permission::UsersCreate,
    Permission::UsersRead,
    Permission::UsersUpdate,
    Permission::UsersDelete,
];

const CRUD_APPOINTMENTS: [Permission; 4] = [
    Permission::AppointmentsCreate,
    Permission::AppointmentsRead,
    Permission::AppointmentsUpdate,
    Permission::AppointmentsDelete,
];

/// Permissions granted to a freshly created user of the given role.
///
/// Nobody receives `patients.delete`: patient rows are only ever deactivated.
pub fn default_permissions_for(role: Role) -> PermissionSet {
    let mut set = PermissionSet::new();
    match role {
        Role::Owner => {
            set.extend(CRUD_USERS);
            set.extend([
                Permission::OrganizationManage,
                Permission::ReportsRead,
                Permission::SettingsUpdate,
            ]);
        }
        Role::Admin => {
            set.extend(CRUD_USERS);
            set.insert(Permission::ReportsRead);
        }
        Role::Dentist => {
            set.insert(Permission::UsersRead);
            set.extend([
                Permission::PatientsCreate,
                Permission::PatientsRead,
                Permission::PatientsUpdate,
            ]);
            set.extend(CRUD_APPOINTMENTS);
        }
        Role::Secretary => {
            set.insert(Permission::UsersRead);
            set.insert(Permission::PatientsRead);
            set.extend(CRUD_APPOINTMENTS);
        }
    }
    set
}

/// Parse stored permission strings, dropping (and logging) unknown tags
pub fn parse_permissions<I, S>(raw: I) -> PermissionSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|s| match s.as_ref().parse::<Permission>() {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!("Ignoring stored permission: {}", e);
                None
            }
        })
        .collect()
}

pub fn permission_strings(set: &PermissionSet) -> Vec<String> {
    set.iter().map(|p| p.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_manages_organization_and_users() {
        let owner = default_permissions_for(Role::Owner);
        assert!(owner.contains(&Permission::OrganizationManage));
        assert!(owner.contains(&Permission::SettingsUpdate));
        for p in CRUD_USERS {
            assert!(owner.contains(&p), "owner missing {}", p);
        }
        assert!(!owner.contains(&Permission::PatientsRead));
    }

    #[test]
    fn admin_cannot_manage_organization() {
        let admin = default_permissions_for(Role::Admin);
        assert!(admin.contains(&Permission::UsersDelete));
        assert!(admin.contains(&Permission::ReportsRead));
        assert!(!admin.contains(&Permission::OrganizationManage));
    }

    #[test]
    fn dentist_writes_patients_but_never_deletes_them() {
        let dentist = default_permissions_for(Role::Dentist);
        assert!(dentist.contains(&Permission::PatientsCreate));
        assert!(dentist.contains(&Permission::PatientsUpdate));
        assert!(!dentist.contains(&Permission::PatientsDelete));
        assert!(!dentist.contains(&Permission::UsersCreate));
    }

    #[test]
    fn secretary_only_reads_patients() {
        let secretary = default_permissions_for(Role::Secretary);
        assert!(secretary.contains(&Permission::PatientsRead));
        assert!(!secretary.contains(&Permission::PatientsCreate));
        assert!(secretary.contains(&Permission::AppointmentsDelete));
    }

    #[test]
    fn nobody_gets_patient_delete() {
        for role in Role::ALL {
            assert!(!default_permissions_for(role).contains(&Permission::PatientsDelete));
        }
    }

    #[test]
    fn permission_strings_round_trip() {
        for p in Permission::ALL {
            assert_eq!(p.as_str().parse::<Permission>().unwrap(), p);
        }
        let json = serde_json::to_string(&Permission::OrganizationManage).unwrap();
        assert_eq!(json, "\"organization.manage\"");
        assert!(serde_json::from_str::<Permission>("\"users.*\"").is_err());
    }

    #[test]
    fn unknown_stored_permissions_are_dropped() {
        let set = parse_permissions(["users.read", "legacy.thing", "reports.read"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Permission::ReportsRead));
    }
}
