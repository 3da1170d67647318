use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::{auth::User, error::AppError};
use shared_utils::extractor::{is_admin, user_uuid};

use crate::models::{CreatePatientRequest, PatientError, UpdatePatientRequest};
use crate::services::store::PatientDirectory;

#[derive(Clone)]
pub struct PatientCellState {
    pub config: Arc<AppConfig>,
    pub patients: Arc<dyn PatientDirectory>,
}

impl PatientCellState {
    pub fn new(config: Arc<AppConfig>, patients: Arc<dyn PatientDirectory>) -> Self {
        Self { config, patients }
    }
}

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient profile not found".to_string()),
        PatientError::Validation(msg) => AppError::ValidationError(msg),
        PatientError::Database(msg) => AppError::Database(msg),
    }
}

pub async fn get_my_profile(
    State(state): State<PatientCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = user_uuid(&user)?;
    let patient = state.patients.get_patient(patient_id).await.map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}

pub async fn update_my_profile(
    State(state): State<PatientCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = user_uuid(&user)?;
    let patient = state.patients
        .update_profile(patient_id, request)
        .await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile Updated",
        "patient": patient
    })))
}

pub async fn create_patient(
    State(state): State<PatientCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    if !is_admin(&user, &state.config) {
        return Err(AppError::Forbidden("Only administrators can register patients".to_string()));
    }

    let patient = state.patients.create_patient(request).await.map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}
