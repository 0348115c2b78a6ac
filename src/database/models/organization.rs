use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::common::{contains_folded, Address, Pagination};
use crate::database::manager::DatabaseError;
use crate::types::PlanTier;

/// A clinic: the tenant root every user and patient hangs off
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub document: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Address,
    pub subscription: Subscription,
    pub settings: Value,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan: PlanTier,
    pub max_users: i32,
    pub max_patients: i32,
    pub features: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Subscription {
    /// Plan defaults for `plan`, expiring at `expires_at`
    pub fn for_plan(plan: PlanTier, expires_at: Option<DateTime<Utc>>) -> Self {
        let (max_users, max_patients) = plan.limits();
        Self {
            plan,
            max_users: max_users as i32,
            max_patients: max_patients as i32,
            features: plan.features(),
            expires_at,
            is_active: true,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at < now).unwrap_or(false)
    }

    /// Whole days until expiry, never negative; `None` for open-ended plans
    pub fn days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|at| (at - now).num_days().max(0))
    }
}

#[derive(Debug, FromRow)]
pub struct OrganizationRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub document: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Json<Address>,
    pub plan: String,
    pub max_users: i32,
    pub max_patients: i32,
    pub features: Vec<String>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub subscription_active: bool,
    pub settings: Json<Value>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = DatabaseError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        let plan = row
            .plan
            .parse::<PlanTier>()
            .map_err(|e| DatabaseError::CorruptRow(format!("organization {}: {}", row.id, e)))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            document: row.document,
            email: row.email,
            phone: row.phone,
            address: row.address.0,
            subscription: Subscription {
                plan,
                max_users: row.max_users,
                max_patients: row.max_patients,
                features: row.features,
                expires_at: row.subscription_expires_at,
                is_active: row.subscription_active,
            },
            settings: row.settings.0,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationFilter {
    pub is_active: Option<bool>,
    pub plan: Option<PlanTier>,
    /// Partial match on name, email, slug
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrganizationQuery {
    pub filter: OrganizationFilter,
    pub pagination: Pagination,
}

impl OrganizationFilter {
    pub fn matches(&self, org: &Organization) -> bool {
        if let Some(active) = self.is_active {
            if org.is_active != active {
                return false;
            }
        }
        if let Some(plan) = self.plan {
            if org.subscription.plan != plan {
                return false;
            }
        }
        if let Some(term) = self.search.as_deref() {
            let term = term.to_lowercase();
            if !(contains_folded(Some(&org.name), &term)
                || contains_folded(Some(&org.email), &term)
                || contains_folded(Some(&org.slug), &term))
            {
                return false;
            }
        }
        true
    }
}

/// Fields an update may touch. Identity, slug and audit columns are absent on purpose.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::common::nullable")]
    pub document: Option<Option<String>>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "super::common::nullable")]
    pub phone: Option<Option<String>>,
    pub address: Option<Address>,
    pub settings: Option<Value>,
    pub subscription: Option<SubscriptionChanges>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionChanges {
    pub plan: Option<PlanTier>,
    pub max_users: Option<i32>,
    pub max_patients: Option<i32>,
    pub features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "super::common::nullable")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

impl SubscriptionChanges {
    /// Apply onto `current`. Switching plan resets limits and features to the
    /// new tier's defaults before explicit overrides are applied.
    pub fn apply(self, current: &mut Subscription) {
        if let Some(plan) = self.plan {
            if plan != current.plan {
                let fresh = Subscription::for_plan(plan, current.expires_at);
                current.plan = fresh.plan;
                current.max_users = fresh.max_users;
                current.max_patients = fresh.max_patients;
                current.features = fresh.features;
            }
        }
        if let Some(v) = self.max_users {
            current.max_users = v;
        }
        if let Some(v) = self.max_patients {
            current.max_patients = v;
        }
        if let Some(v) = self.features {
            current.features = v;
        }
        if let Some(v) = self.expires_at {
            current.expires_at = v;
        }
        if let Some(v) = self.is_active {
            current.is_active = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn plan_change_resets_limits_then_applies_overrides() {
        let mut sub = Subscription::for_plan(PlanTier::Starter, None);
        SubscriptionChanges {
            plan: Some(PlanTier::Professional),
            max_users: Some(25),
            ..Default::default()
        }
        .apply(&mut sub);

        assert_eq!(sub.plan, PlanTier::Professional);
        assert_eq!(sub.max_users, 25);
        assert_eq!(sub.max_patients, 5_000);
        assert!(sub.features.contains(&"reports".to_string()));
    }

    #[test]
    fn expiry_helpers() {
        let now = Utc::now();
        let sub = Subscription::for_plan(PlanTier::Starter, Some(now + Duration::days(30) + Duration::hours(1)));
        assert!(!sub.is_expired(now));
        assert_eq!(sub.days_remaining(now), Some(30));

        let lapsed = Subscription::for_plan(PlanTier::Starter, Some(now - Duration::days(1)));
        assert!(lapsed.is_expired(now));
        assert_eq!(lapsed.days_remaining(now), Some(0));
    }
}
