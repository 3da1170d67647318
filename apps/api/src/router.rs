use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::{info, warn};

use appointment_cell::handlers::AppointmentCellState;
use appointment_cell::router::appointment_routes;
use appointment_cell::services::{
    AppointmentLedger, AppointmentLifecycleService, InMemoryAppointmentLedger, SupabaseAppointmentLedger,
};
use doctor_cell::handlers::DoctorCellState;
use doctor_cell::models::CalendarConfig;
use doctor_cell::router::doctor_routes;
use doctor_cell::services::{DoctorDirectory, InMemoryDoctorStore, ReservationStore, SupabaseDoctorStore};
use patient_cell::handlers::PatientCellState;
use patient_cell::router::patient_routes;
use patient_cell::services::{InMemoryPatientStore, PatientDirectory, SupabasePatientStore};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

struct Backends {
    doctors: Arc<dyn DoctorDirectory>,
    reservations: Arc<dyn ReservationStore>,
    patients: Arc<dyn PatientDirectory>,
    ledger: Arc<dyn AppointmentLedger>,
}

fn backends(config: &AppConfig) -> Backends {
    if config.is_configured() {
        let supabase = Arc::new(SupabaseClient::new(config));
        info!("Using Supabase storage at {}", supabase.get_base_url());
        let doctors = Arc::new(SupabaseDoctorStore::new(supabase.clone()));
        Backends {
            doctors: doctors.clone(),
            reservations: doctors,
            patients: Arc::new(SupabasePatientStore::new(supabase.clone())),
            ledger: Arc::new(SupabaseAppointmentLedger::new(supabase)),
        }
    } else {
        warn!("Supabase is not configured, data is kept in memory only");
        let doctors = Arc::new(InMemoryDoctorStore::new());
        Backends {
            doctors: doctors.clone(),
            reservations: doctors,
            patients: Arc::new(InMemoryPatientStore::new()),
            ledger: Arc::new(InMemoryAppointmentLedger::new()),
        }
    }
}

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let stores = backends(&config);
    // One grid for both the slot listing and the booking check.
    let calendar = CalendarConfig::default();
    let lifecycle = Arc::new(AppointmentLifecycleService::new(
        stores.doctors.clone(),
        stores.reservations,
        stores.patients.clone(),
        stores.ledger,
        calendar,
    ));

    Router::new()
        .route("/", get(|| async { "Amae booking API is running!" }))
        .nest("/doctors", doctor_routes(DoctorCellState::new(config.clone(), stores.doctors, calendar)))
        .nest("/patients", patient_routes(PatientCellState::new(config.clone(), stores.patients)))
        .nest("/appointments", appointment_routes(AppointmentCellState::new(config, lifecycle)))
}
