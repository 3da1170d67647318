use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use patient_cell::handlers::PatientCellState;
use patient_cell::models::{Address, CreatePatientRequest};
use patient_cell::router::patient_routes;
use patient_cell::services::{InMemoryPatientStore, PatientDirectory};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn app(store: Arc<InMemoryPatientStore>, config: &TestConfig) -> Router {
    patient_routes(PatientCellState::new(config.to_arc(), store))
}

async fn call(app: &Router, method: Method, uri: &str, bearer: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_own_profile_read_and_update() {
    let config = TestConfig::default();
    let store = Arc::new(InMemoryPatientStore::new());
    let user = TestUser::patient("ana@patients.test");

    store.create_patient(CreatePatientRequest {
        id: Some(user.uuid()),
        name: "Ana".to_string(),
        email: user.email.clone(),
        image: None,
        phone: None,
        gender: None,
        dob: None,
        address: Address::default(),
    }).await.unwrap();

    let app = app(store.clone(), &config);
    let bearer = JwtTestUtils::bearer(&user, &config.jwt_secret);

    let (status, body) = call(&app, Method::GET, "/me", &bearer, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient"]["phone"], "0000000000");

    let (status, body) = call(
        &app,
        Method::PUT,
        "/me",
        &bearer,
        Some(json!({ "phone": "5551234", "dob": "1990-04-02", "address": { "line1": "1 Main St", "line2": "" } })),
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["patient"]["dob"], "1990-04-02");

    let stored = store.get_patient(user.uuid()).await.unwrap();
    assert_eq!(stored.phone, "5551234");
    assert_eq!(stored.address.line1, "1 Main St");
}

#[tokio::test]
async fn test_missing_profile_and_missing_token() {
    let config = TestConfig::default();
    let app = app(Arc::new(InMemoryPatientStore::new()), &config);

    let bearer = JwtTestUtils::bearer(&TestUser::patient("ghost@patients.test"), &config.jwt_secret);
    let (status, _) = call(&app, Method::GET, "/me", &bearer, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let expired = format!(
        "Bearer {}",
        JwtTestUtils::create_expired_token(&TestUser::patient("late@patients.test"), &config.jwt_secret)
    );
    let (status, _) = call(&app, Method::GET, "/me", &expired, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_only_admin_registers_patients() {
    let config = TestConfig::default();
    let store = Arc::new(InMemoryPatientStore::new());
    let app = app(store.clone(), &config);
    let payload = json!({ "name": "Ben", "email": "ben@patients.test" });

    let patient = JwtTestUtils::bearer(&TestUser::patient("p@patients.test"), &config.jwt_secret);
    let (status, _) = call(&app, Method::POST, "/", &patient, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = JwtTestUtils::bearer(&TestUser::admin("ops@clinic.test"), &config.jwt_secret);
    let (status, _) = call(&app, Method::POST, "/", &admin, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::POST, "/", &admin, Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    assert_eq!(store.count_patients().await.unwrap(), 1);
}
