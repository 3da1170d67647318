use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::models::{PatientError, UpdatePatientRequest};
use patient_cell::services::{PatientDirectory, SupabasePatientStore};
use shared_database::SupabaseClient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn store_for(server: &MockServer) -> SupabasePatientStore {
    let config = TestConfig::with_supabase(&server.uri()).to_app_config();
    SupabasePatientStore::new(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::test]
async fn test_get_patient_reads_row() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_row(&patient_id.to_string(), "Ana")
        ])))
        .mount(&server)
        .await;

    let patient = store_for(&server).get_patient(patient_id).await.unwrap();
    assert_eq!(patient.name, "Ana");
    assert_eq!(patient.gender, None);
}

#[tokio::test]
async fn test_missing_patient_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_matches!(store_for(&server).get_patient(Uuid::new_v4()).await, Err(PatientError::NotFound));
}

#[tokio::test]
async fn test_update_patches_only_given_fields() {
    let server = MockServer::start().await;
    let patient_id = Uuid::new_v4();
    let mut row = MockSupabaseResponses::patient_row(&patient_id.to_string(), "Ana");
    row["phone"] = json!("5551234");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", format!("eq.{}", patient_id)))
        .and(body_partial_json(json!({ "phone": "5551234" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&server)
        .await;

    let updated = store_for(&server)
        .update_profile(patient_id, UpdatePatientRequest {
            phone: Some("5551234".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.phone, "5551234");
}

#[tokio::test]
async fn test_count_patients() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("select", "id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": Uuid::new_v4() },
            { "id": Uuid::new_v4() }
        ])))
        .mount(&server)
        .await;

    assert_eq!(store_for(&server).count_patients().await.unwrap(), 2);
}
