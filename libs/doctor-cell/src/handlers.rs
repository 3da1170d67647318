use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{auth::User, error::AppError};
use shared_utils::extractor::{is_admin, user_uuid};

use crate::models::{
    AvailableSlotsResponse, CalendarConfig, CreateDoctorRequest, DoctorError,
    UpdateDoctorProfileRequest,
};
use crate::services::calendar::{available_slots, clinic_local_time};
use crate::services::store::DoctorDirectory;

#[derive(Clone)]
pub struct DoctorCellState {
    pub config: Arc<AppConfig>,
    pub doctors: Arc<dyn DoctorDirectory>,
    pub calendar: CalendarConfig,
}

impl DoctorCellState {
    pub fn new(config: Arc<AppConfig>, doctors: Arc<dyn DoctorDirectory>, calendar: CalendarConfig) -> Self {
        Self { config, doctors, calendar }
    }
}

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::Validation(msg) => AppError::ValidationError(msg),
        DoctorError::Database(msg) => AppError::Database(msg),
    }
}

/// Admins may manage any doctor; a doctor only their own record.
fn ensure_self_or_admin(state: &DoctorCellState, user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    if is_admin(user, &state.config) {
        return Ok(());
    }
    if user.has_role("doctor") && user_uuid(user)? == doctor_id {
        return Ok(());
    }
    Err(AppError::Forbidden("Not authorized to manage this doctor".to_string()))
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

pub async fn list_doctors(
    State(state): State<DoctorCellState>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.doctors.list_doctors().await.map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors,
        "total": doctors.len()
    })))
}

pub async fn get_doctor(
    State(state): State<DoctorCellState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = state.doctors.get_doctor(doctor_id).await.map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

/// Seven day-buckets of free slots, computed against the clinic's current local time.
pub async fn get_available_slots(
    State(state): State<DoctorCellState>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<AvailableSlotsResponse>, AppError> {
    let doctor = state.doctors.get_doctor(doctor_id).await.map_err(map_doctor_error)?;
    let now = clinic_local_time(Utc::now(), state.config.clinic_utc_offset_minutes);

    let response = available_slots(&doctor, now, state.calendar);
    debug!("Computed {} calendar days for doctor {}", response.days.len(), doctor_id);

    Ok(Json(response))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

pub async fn create_doctor(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    if !is_admin(&user, &state.config) {
        return Err(AppError::Forbidden("Only administrators can add doctors".to_string()));
    }

    let doctor = state.doctors.create_doctor(request).await.map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Doctor added",
        "doctor": doctor
    })))
}

pub async fn toggle_availability(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ensure_self_or_admin(&state, &user, doctor_id)?;

    let doctor = state.doctors.toggle_availability(doctor_id).await.map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Doctor is now {}", if doctor.available { "Available" } else { "Unavailable" }),
        "available": doctor.available
    })))
}

pub async fn update_profile(
    State(state): State<DoctorCellState>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorProfileRequest>,
) -> Result<Json<Value>, AppError> {
    ensure_self_or_admin(&state, &user, doctor_id)?;

    let doctor = state.doctors.update_profile(doctor_id, request).await.map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile Updated Successfully",
        "doctor": doctor
    })))
}
