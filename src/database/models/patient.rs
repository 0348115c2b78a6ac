use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::common::{contains_folded, nullable, Address, Pagination};
use crate::database::manager::DatabaseError;
use crate::types::Gender;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Address,
    pub medical_info: MedicalInfo,
    pub emergency_contact: EmergencyContact,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicalInfo {
    pub allergies: Vec<String>,
    pub medications: Vec<String>,
    pub conditions: Vec<String>,
    pub history: Option<String>,
    pub blood_type: Option<String>,
    pub insurance: Insurance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Insurance {
    pub provider: Option<String>,
    pub plan: Option<String>,
    pub number: Option<String>,
    pub valid_until: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct PatientRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Json<Address>,
    pub medical_info: Json<MedicalInfo>,
    pub emergency_contact: Json<EmergencyContact>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = DatabaseError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = row
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(|e| DatabaseError::CorruptRow(format!("patient {}: {}", row.id, e)))?;

        Ok(Self {
            id: row.id,
            organization_id: row.organization_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            document: row.document,
            birth_date: row.birth_date,
            gender,
            address: row.address.0,
            medical_info: row.medical_info.0,
            emergency_contact: row.emergency_contact.0,
            notes: row.notes,
            created_by: row.created_by,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    pub gender: Option<Gender>,
    pub is_active: Option<bool>,
    /// Partial match on name, email, document, phone
    pub search: Option<String>,
}

impl PatientFilter {
    pub fn matches(&self, patient: &Patient) -> bool {
        if self.gender.is_some() && self.gender != patient.gender {
            return false;
        }
        if self.is_active.map(|a| a != patient.is_active).unwrap_or(false) {
            return false;
        }
        if let Some(term) = self.search.as_deref() {
            let term = term.to_lowercase();
            if !(contains_folded(Some(&patient.name), &term)
                || contains_folded(patient.email.as_deref(), &term)
                || contains_folded(patient.document.as_deref(), &term)
                || contains_folded(patient.phone.as_deref(), &term))
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct PatientQuery {
    pub filter: PatientFilter,
    pub pagination: Pagination,
}

/// Partial update of a patient. Omitted fields are left alone; `null` clears
/// a nullable field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientChanges {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub document: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub birth_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "nullable")]
    pub gender: Option<Option<Gender>>,
    pub address: Option<Address>,
    pub medical_info: Option<MedicalInfo>,
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_ignore_immutable_fields() {
        let raw = serde_json::json!({
            "id": Uuid::new_v4(),
            "organizationId": Uuid::new_v4(),
            "createdBy": Uuid::new_v4(),
            "createdAt": "2020-01-01T00:00:00Z",
            "phone": "555-0100",
            "notes": null
        });
        let changes: PatientChanges = serde_json::from_value(raw).unwrap();
        assert_eq!(changes.phone, Some(Some("555-0100".to_string())));
        assert_eq!(changes.notes, Some(None));
        assert!(changes.name.is_none());
    }

    #[test]
    fn medical_info_defaults_missing_lists() {
        let info: MedicalInfo = serde_json::from_str(r#"{"allergies":["penicillin"],"bloodType":"O+"}"#).unwrap();
        assert_eq!(info.allergies, vec!["penicillin".to_string()]);
        assert!(info.medications.is_empty());
        assert_eq!(info.blood_type.as_deref(), Some("O+"));
    }
}
