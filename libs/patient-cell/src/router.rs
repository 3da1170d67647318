use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, PatientCellState};

pub fn patient_routes(state: PatientCellState) -> Router {
    Router::new()
        .route("/", post(handlers::create_patient))
        .route("/me", get(handlers::get_my_profile).put(handlers::update_my_profile))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
