use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{check_fields, ensure_capacity, resolve_pagination};
use crate::config::PaginationConfig;
use crate::database::models::{
    Address, EmergencyContact, MedicalInfo, Organization, PaginationMeta, Pagination, Patient, PatientChanges,
    PatientFilter, PatientQuery,
};
use crate::database::{AdminStore, TenantStore};
use crate::error::ApiError;
use crate::middleware::{CurrentUser, OrganizationScope};
use crate::types::Gender;
use crate::validation::{
    non_blank, normalize_document, normalize_email, validate_birth_date, validate_blood_type, validate_email_format,
    FieldErrors,
};
use crate::AppState;

const SEARCH_LIMIT: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct PatientListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub gender: Option<Gender>,
    pub active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatientSearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<Address>,
    pub medical_info: Option<MedicalInfo>,
    pub emergency_contact: Option<EmergencyContact>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PatientList {
    pub patients: Vec<Patient>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct PatientMatches {
    pub patients: Vec<Patient>,
}

/// A patient together with the name of the user who registered it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub created_by_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub by_gender: BTreeMap<&'static str, i64>,
}

pub struct PatientService {
    caller: CurrentUser,
    organization: Organization,
    store: TenantStore,
    admin: AdminStore,
    pagination: PaginationConfig,
}

impl PatientService {
    pub fn new(state: &AppState, caller: CurrentUser, scope: OrganizationScope) -> Self {
        Self {
            caller,
            organization: scope.organization,
            store: scope.store,
            admin: state.store.admin(),
            pagination: state.config.pagination.clone(),
        }
    }

    pub async fn list(&self, query: PatientListQuery) -> Result<PatientList, ApiError> {
        let pagination = resolve_pagination(query.page, query.limit, &self.pagination);
        let filter = PatientFilter {
            gender: query.gender,
            is_active: query.active,
            search: non_blank(query.search),
        };

        let page = self.store.list_patients(&PatientQuery { filter, pagination }).await?;
        Ok(PatientList {
            patients: page.items,
            pagination: pagination.meta(page.total),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<PatientDetail, ApiError> {
        let patient = self.find(id).await?;

        // The creator may be a system user outside this organization
        let created_by_name = match patient.created_by {
            Some(user_id) => self.admin.find_user(user_id).await?.map(|u| u.name),
            None => None,
        };

        Ok(PatientDetail { patient, created_by_name })
    }

    pub async fn create(&self, request: CreatePatientRequest) -> Result<Patient, ApiError> {
        let now = Utc::now();
        let mut patient = Patient {
            id: Uuid::new_v4(),
            organization_id: self.organization.id,
            name: String::new(),
            email: None,
            phone: non_blank(request.phone),
            document: None,
            birth_date: request.birth_date,
            gender: request.gender,
            address: request.address.unwrap_or_default(),
            medical_info: request.medical_info.unwrap_or_default(),
            emergency_contact: request.emergency_contact.unwrap_or_default(),
            notes: non_blank(request.notes),
            created_by: Some(self.caller.id),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut errors = FieldErrors::new();
        match non_blank(request.name) {
            Some(name) => patient.name = name,
            None => errors.add("name", "This field is required"),
        }
        patient.email = checked_email(request.email, &mut errors);
        patient.document = request.document.as_deref().and_then(normalize_document);
        check_clinical_fields(&mut patient, &mut errors);
        check_fields(errors)?;

        let current = self.store.count_patients(&PatientFilter::default()).await?;
        ensure_capacity(current, self.organization.subscription.max_patients, "patients")?;

        self.check_unique(&patient, true, true).await?;

        self.store.insert_patient(&patient).await?;
        tracing::info!("Patient {} created in organization {} by {}", patient.id, self.organization.id, self.caller.id);
        Ok(patient)
    }

    /// Partial update. Uniqueness is re-checked only for a changed document or email.
    pub async fn update(&self, id: Uuid, changes: PatientChanges) -> Result<Patient, ApiError> {
        let mut patient = self.find(id).await?;
        let mut errors = FieldErrors::new();

        if let Some(name) = changes.name {
            match non_blank(Some(name)) {
                Some(name) => patient.name = name,
                None => errors.add("name", "Name cannot be empty"),
            }
        }

        let mut email_changed = false;
        if let Some(email) = changes.email {
            let email = checked_email(email, &mut errors);
            email_changed = email != patient.email;
            patient.email = email;
        }

        let mut document_changed = false;
        if let Some(document) = changes.document {
            let document = document.as_deref().and_then(normalize_document);
            document_changed = document != patient.document;
            patient.document = document;
        }

        if let Some(phone) = changes.phone {
            patient.phone = non_blank(phone);
        }
        if let Some(birth_date) = changes.birth_date {
            patient.birth_date = birth_date;
        }
        if let Some(gender) = changes.gender {
            patient.gender = gender;
        }
        if let Some(address) = changes.address {
            patient.address = address;
        }
        if let Some(medical_info) = changes.medical_info {
            patient.medical_info = medical_info;
        }
        if let Some(emergency_contact) = changes.emergency_contact {
            patient.emergency_contact = emergency_contact;
        }
        if let Some(notes) = changes.notes {
            patient.notes = non_blank(notes);
        }

        check_clinical_fields(&mut patient, &mut errors);
        check_fields(errors)?;

        self.check_unique(&patient, document_changed, email_changed).await?;

        patient.updated_at = Utc::now();
        self.store.update_patient(&patient).await?;
        tracing::info!("Patient {} updated by {}", patient.id, self.caller.id);
        Ok(patient)
    }

    /// Soft delete and restore
    pub async fn toggle_status(&self, id: Uuid) -> Result<Patient, ApiError> {
        let patient = self
            .store
            .toggle_patient_status(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Patient not found"))?;
        tracing::info!(
            "Patient {} {} by {}",
            patient.id,
            if patient.is_active { "activated" } else { "deactivated" },
            self.caller.id
        );
        Ok(patient)
    }

    /// Quick lookup for pickers: a handful of active patients matching `q`
    pub async fn search(&self, query: PatientSearchQuery) -> Result<PatientMatches, ApiError> {
        let term = non_blank(query.q).ok_or_else(|| ApiError::invalid_field("q", "Search term is required"))?;

        let query = PatientQuery {
            filter: PatientFilter {
                is_active: Some(true),
                search: Some(term),
                ..Default::default()
            },
            pagination: Pagination::new(1, SEARCH_LIMIT),
        };
        let page = self.store.list_patients(&query).await?;
        Ok(PatientMatches { patients: page.items })
    }

    pub async fn stats(&self) -> Result<PatientStats, ApiError> {
        let active = PatientFilter { is_active: Some(true), ..Default::default() };
        let all = PatientFilter::default();
        let (total, active) = futures::try_join!(
            self.store.count_patients(&all),
            self.store.count_patients(&active),
        )?;

        let mut by_gender = BTreeMap::new();
        for gender in Gender::ALL {
            let filter = PatientFilter { gender: Some(gender), ..Default::default() };
            by_gender.insert(gender.as_str(), self.store.count_patients(&filter).await?);
        }

        Ok(PatientStats { total, active, inactive: total - active, by_gender })
    }

    async fn find(&self, id: Uuid) -> Result<Patient, ApiError> {
        self.store
            .find_patient(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Patient not found"))
    }

    async fn check_unique(&self, patient: &Patient, document: bool, email: bool) -> Result<(), ApiError> {
        if let Some(doc) = patient.document.as_deref().filter(|_| document) {
            if let Some(other) = self.store.find_patient_by_document(doc).await? {
                if other.id != patient.id {
                    return Err(ApiError::duplicate("A patient with this document already exists"));
                }
            }
        }
        if let Some(addr) = patient.email.as_deref().filter(|_| email) {
            if let Some(other) = self.store.find_patient_by_email(addr).await? {
                if other.id != patient.id {
                    return Err(ApiError::duplicate("A patient with this email already exists"));
                }
            }
        }
        Ok(())
    }
}

/// Optional email, case-folded; a malformed one is recorded as a field error
fn checked_email(email: Option<String>, errors: &mut FieldErrors) -> Option<String> {
    let email = non_blank(email).map(|e| normalize_email(&e))?;
    if let Err(msg) = validate_email_format(&email) {
        errors.add("email", msg);
    }
    Some(email)
}

/// Blood type is canonicalized in place; birth date may not be in the future
fn check_clinical_fields(patient: &mut Patient, errors: &mut FieldErrors) {
    if let Some(blood_type) = patient.medical_info.blood_type.take() {
        match non_blank(Some(blood_type)) {
            Some(value) => match validate_blood_type(&value) {
                Ok(canonical) => patient.medical_info.blood_type = Some(canonical),
                Err(msg) => errors.add("medicalInfo.bloodType", msg),
            },
            None => patient.medical_info.blood_type = None,
        }
    }
    if let Some(birth_date) = patient.birth_date {
        if let Err(msg) = validate_birth_date(birth_date, Utc::now().date_naive()) {
            errors.add("birthDate", msg);
        }
    }
}
