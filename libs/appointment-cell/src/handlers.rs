use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{auth::User, error::AppError};
use shared_utils::extractor::{is_admin, user_uuid};

use crate::models::{Actor, AppointmentError, BookAppointmentRequest, LedgerOutcome, RepairQuery};
use crate::services::lifecycle::AppointmentLifecycleService;

#[derive(Clone)]
pub struct AppointmentCellState {
    pub config: Arc<AppConfig>,
    pub lifecycle: Arc<AppointmentLifecycleService>,
}

impl AppointmentCellState {
    pub fn new(config: Arc<AppConfig>, lifecycle: Arc<AppointmentLifecycleService>) -> Self {
        Self { config, lifecycle }
    }

    fn actor(&self, user: &User) -> Result<Actor, AppError> {
        if is_admin(user, &self.config) {
            return Ok(Actor::Admin);
        }
        let id = user_uuid(user)?;
        if user.has_role("doctor") {
            Ok(Actor::Doctor(id))
        } else {
            Ok(Actor::Patient(id))
        }
    }

    fn require_admin(&self, user: &User) -> Result<(), AppError> {
        if is_admin(user, &self.config) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Administrator access required".to_string()))
        }
    }

    fn require_doctor(&self, user: &User) -> Result<Uuid, AppError> {
        match self.actor(user)? {
            Actor::Doctor(doctor_id) => Ok(doctor_id),
            _ => Err(AppError::Forbidden("Doctor access required".to_string())),
        }
    }
}

fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::PatientNotFound => AppError::NotFound("Patient profile not found".to_string()),
        AppointmentError::SlotNotAvailable => {
            AppError::Conflict("Slot not available, please pick another".to_string())
        }
        AppointmentError::DoctorNotAvailable => AppError::Conflict("Doctor not available".to_string()),
        AppointmentError::Forbidden => {
            AppError::Forbidden("Not authorized to act on this appointment".to_string())
        }
        AppointmentError::InvalidSlot(msg) => AppError::BadRequest(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        e @ AppointmentError::CompensationFailed { .. } => AppError::Internal(e.to_string()),
    }
}

// ==============================================================================
// BOOKING & LIFECYCLE
// ==============================================================================

pub async fn book_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let slot = request.slot_key().map_err(map_appointment_error)?;

    let appointment = state.lifecycle
        .book_appointment(user_id, request.doctor_id, slot)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment Booked",
        "appointment": appointment
    })))
}

pub async fn cancel_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let actor = state.actor(&user)?;
    let outcome = state.lifecycle
        .cancel_appointment(appointment_id, actor)
        .await
        .map_err(map_appointment_error)?;

    let message = match &outcome {
        LedgerOutcome::Applied(_) => "Appointment Cancelled",
        LedgerOutcome::AlreadyTerminal(a) if a.cancelled => "Appointment already cancelled",
        LedgerOutcome::AlreadyTerminal(_) => "Appointment already completed",
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "appointment": outcome.into_appointment()
    })))
}

pub async fn complete_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = state.require_doctor(&user)?;
    let outcome = state.lifecycle
        .complete_appointment(appointment_id, doctor_id)
        .await
        .map_err(map_appointment_error)?;

    let message = match &outcome {
        LedgerOutcome::Applied(_) => "Appointment Completed",
        LedgerOutcome::AlreadyTerminal(a) if a.cancelled => "Appointment was cancelled",
        LedgerOutcome::AlreadyTerminal(_) => "Appointment already completed",
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "appointment": outcome.into_appointment()
    })))
}

/// Payment confirmation hook; the gateway itself lives outside this service.
pub async fn confirm_payment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.require_admin(&user)?;

    match state.lifecycle.mark_paid(appointment_id).await.map_err(map_appointment_error)? {
        LedgerOutcome::Applied(appointment) => Ok(Json(json!({
            "success": true,
            "message": "Payment Successful",
            "appointment": appointment
        }))),
        LedgerOutcome::AlreadyTerminal(_) => Err(AppError::Conflict(
            "Cancelled appointments cannot be paid".to_string(),
        )),
    }
}

// ==============================================================================
// LISTINGS
// ==============================================================================

pub async fn get_appointment(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let actor = state.actor(&user)?;
    let appointment = state.lifecycle
        .get_appointment(appointment_id, actor)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub async fn list_my_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let appointments = state.lifecycle.list_for_user(user_id).await.map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn list_doctor_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = state.require_doctor(&user)?;
    let appointments = state.lifecycle.list_for_doctor(doctor_id).await.map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn list_all_appointments(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    state.require_admin(&user)?;
    let appointments = state.lifecycle.list_all().await.map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

// ==============================================================================
// DASHBOARDS & MAINTENANCE
// ==============================================================================

pub async fn doctor_dashboard(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = state.require_doctor(&user)?;
    let dashboard = state.lifecycle.doctor_dashboard(doctor_id).await.map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "dashboard": dashboard
    })))
}

pub async fn admin_dashboard(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    state.require_admin(&user)?;
    let dashboard = state.lifecycle.admin_dashboard().await.map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "dashboard": dashboard
    })))
}

pub async fn repair_reservations(
    State(state): State<AppointmentCellState>,
    Extension(user): Extension<User>,
    Query(query): Query<RepairQuery>,
) -> Result<Json<Value>, AppError> {
    state.require_admin(&user)?;
    debug!("Repair requested by {} (release={})", user.id, query.release);

    let report = state.lifecycle
        .repair_reservations(query.release)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}
