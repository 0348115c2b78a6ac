// handlers/protected/patients/create.rs - POST /api/patients handler

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, CurrentUser, OrganizationScope, ValidJson};
use crate::services::patient_service::CreatePatientRequest;
use crate::services::PatientService;
use crate::AppState;

/**
 * POST /api/patients - Register a patient in the caller's organization
 *
 * Expected Input (only `name` is required):
 * ```json
 * {
 *   "name": "Maria Silva",
 *   "email": "maria@mail.com",
 *   "phone": "+55 11 99999-0000",
 *   "document": "123.456.789-09",
 *   "birthDate": "1990-04-12",
 *   "gender": "feminino",
 *   "address": { "street": "Rua A", "city": "São Paulo" },
 *   "medicalInfo": { "allergies": ["penicillin"], "bloodType": "O+" },
 *   "emergencyContact": { "name": "João", "phone": "..." },
 *   "notes": "..."
 * }
 * ```
 *
 * Document and email must be unique within the organization (400 DUPLICATE).
 */
pub async fn patients_post(
    State(state): State<AppState>,
    caller: CurrentUser,
    scope: OrganizationScope,
    ValidJson(request): ValidJson<CreatePatientRequest>,
) -> ApiResult<Value> {
    let patient = PatientService::new(&state, caller, scope).create(request).await?;
    Ok(ApiResponse::created(json!({ "patient": patient })))
}
