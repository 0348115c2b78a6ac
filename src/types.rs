/// Shared closed enumerations used across the codebase

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of a user inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Dentist,
    Secretary,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Owner, Role::Admin, Role::Dentist, Role::Secretary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Dentist => "dentist",
            Role::Secretary => "secretary",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "dentist" => Ok(Role::Dentist),
            "secretary" => Ok(Role::Secretary),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}

/// Patient gender as recorded by the clinic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "masculino")]
    Male,
    #[serde(rename = "feminino")]
    Female,
    #[serde(rename = "outro")]
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "masculino",
            Gender::Female => "feminino",
            Gender::Other => "outro",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "masculino" => Ok(Gender::Male),
            "feminino" => Ok(Gender::Female),
            "outro" => Ok(Gender::Other),
            other => Err(UnknownVariant::new("gender", other)),
        }
    }
}

/// Subscription tier of an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Starter,
    Professional,
    Enterprise,
}

impl PlanTier {
    pub const ALL: [PlanTier; 3] = [PlanTier::Starter, PlanTier::Professional, PlanTier::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Starter => "starter",
            PlanTier::Professional => "professional",
            PlanTier::Enterprise => "enterprise",
        }
    }

    /// (max users, max patients) granted by the tier
    pub fn limits(&self) -> (u32, u32) {
        match self {
            PlanTier::Starter => (5, 500),
            PlanTier::Professional => (20, 5_000),
            PlanTier::Enterprise => (100, 50_000),
        }
    }

    pub fn features(&self) -> Vec<String> {
        let features: &[&str] = match self {
            PlanTier::Starter => &["patients", "appointments"],
            PlanTier::Professional => &["patients", "appointments", "reports"],
            PlanTier::Enterprise => &["patients", "appointments", "reports", "api_access", "multi_location"],
        };
        features.iter().map(|f| f.to_string()).collect()
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starter" => Ok(PlanTier::Starter),
            "professional" => Ok(PlanTier::Professional),
            "enterprise" => Ok(PlanTier::Enterprise),
            other => Err(UnknownVariant::new("plan", other)),
        }
    }
}

/// Returned when a stored or supplied string is not a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn gender_uses_portuguese_labels_on_the_wire() {
        let json = serde_json::to_string(&Gender::Female).unwrap();
        assert_eq!(json, "\"feminino\"");
        let parsed: Gender = serde_json::from_str("\"outro\"").unwrap();
        assert_eq!(parsed, Gender::Other);
    }

    #[test]
    fn plan_limits_grow_with_tier() {
        let (starter_users, starter_patients) = PlanTier::Starter.limits();
        let (enterprise_users, enterprise_patients) = PlanTier::Enterprise.limits();
        assert!(enterprise_users > starter_users);
        assert!(enterprise_patients > starter_patients);
        assert!(PlanTier::Enterprise.features().contains(&"api_access".to_string()));
    }
}
