use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentCellState};

pub fn appointment_routes(state: AppointmentCellState) -> Router {
    // All appointment operations require authentication
    Router::new()
        .route("/", post(handlers::book_appointment).get(handlers::list_all_appointments))
        .route("/mine", get(handlers::list_my_appointments))
        .route("/doctor", get(handlers::list_doctor_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/{appointment_id}/payment", post(handlers::confirm_payment))
        .route("/dashboard/doctor", get(handlers::doctor_dashboard))
        .route("/dashboard/admin", get(handlers::admin_dashboard))
        .route("/maintenance/repair", post(handlers::repair_reservations))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
