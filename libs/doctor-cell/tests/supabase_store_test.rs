use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::{DoctorError, ReservationError, SlotKey};
use doctor_cell::services::{DoctorDirectory, ReservationStore, SupabaseDoctorStore};
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

async fn store_for(server: &MockServer) -> SupabaseDoctorStore {
    let config = TestConfig::with_supabase(&server.uri()).to_app_config();
    SupabaseDoctorStore::new(Arc::new(SupabaseClient::new(&config)))
}

async fn mock_availability(server: &MockServer, doctor_id: Uuid, available: Option<bool>) {
    let body = match available {
        Some(available) => json!([{ "available": available }]),
        None => json!([]),
    };
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .and(query_param("select", "available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn slot() -> SlotKey {
    "15_6_2025_10:00".parse().unwrap()
}

#[tokio::test]
async fn test_reserve_inserts_reservation_row() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    mock_availability(&server, doctor_id, Some(true)).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/slot_reservations"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    store.reserve(doctor_id, &slot()).await.unwrap();
}

#[tokio::test]
async fn test_unique_violation_maps_to_conflict() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    mock_availability(&server, doctor_id, Some(true)).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/slot_reservations"))
        .respond_with(ResponseTemplate::new(409).set_body_json(
            MockSupabaseResponses::error_response("duplicate key value violates unique constraint", "23505"),
        ))
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    assert_matches!(store.reserve(doctor_id, &slot()).await, Err(ReservationError::Conflict));
}

#[tokio::test]
async fn test_reserve_checks_doctor_gate_before_inserting() {
    let server = MockServer::start().await;
    let unavailable = Uuid::new_v4();
    let missing = Uuid::new_v4();
    mock_availability(&server, unavailable, Some(false)).await;
    mock_availability(&server, missing, None).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/slot_reservations"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    assert_matches!(store.reserve(unavailable, &slot()).await, Err(ReservationError::DoctorUnavailable));
    assert_matches!(store.reserve(missing, &slot()).await, Err(ReservationError::DoctorNotFound));
}

#[tokio::test]
async fn test_release_of_free_slot_reports_not_reserved() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    mock_availability(&server, doctor_id, Some(true)).await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/slot_reservations"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("slot_time", "eq.10:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    assert_matches!(store.release(doctor_id, &slot()).await, Err(ReservationError::NotReserved));
}

#[tokio::test]
async fn test_storage_failure_is_reported() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    assert_matches!(store.reserve(doctor_id, &slot()).await, Err(ReservationError::Storage(_)));
    assert_matches!(store.get_doctor(doctor_id).await, Err(DoctorError::Database(_)));
}

#[tokio::test]
async fn test_doctor_read_folds_reservations_into_map() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let id = doctor_id.to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_row(&id, "Dr. Test", 500.0, true)
        ])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/slot_reservations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::reservation_row(&id, "15_6_2025", "10:00"),
            MockSupabaseResponses::reservation_row(&id, "15_6_2025", "11:30"),
            MockSupabaseResponses::reservation_row(&id, "16_6_2025", "10:00"),
        ])))
        .mount(&server)
        .await;

    let store = store_for(&server).await;
    let doctor = store.get_doctor(doctor_id).await.unwrap();

    assert_eq!(doctor.fees, 500.0);
    assert_eq!(doctor.slots_booked.len(), 2);
    assert_eq!(doctor.slots_booked["15_6_2025"].len(), 2);
    assert!(doctor.is_reserved(&slot()));
}
